use super::*;
use crate::config::{Config, GenerationConfig};

#[test]
fn generator_configuration() {
    let config = Config {
        generation: GenerationConfig {
            model: "llama3.2:latest".to_string(),
            temperature: 0.7,
        },
        ..Config::default()
    };

    let generator = OllamaGenerator::new(&config).expect("Failed to create generator");

    assert_eq!(generator.model(), "llama3.2:latest");
    assert!((generator.temperature - 0.7).abs() < f32::EPSILON);
}

#[test]
fn transient_errors_identified() {
    assert!(OllamaGenerator::is_transient(&ureq::Error::StatusCode(500)));
    assert!(OllamaGenerator::is_transient(&ureq::Error::StatusCode(503)));
    assert!(OllamaGenerator::is_transient(&ureq::Error::ConnectionFailed));
    assert!(!OllamaGenerator::is_transient(&ureq::Error::StatusCode(404)));
    assert!(!OllamaGenerator::is_transient(&ureq::Error::StatusCode(400)));
}

#[test]
fn request_serialization_shape() {
    let request = GenerateRequest {
        model: "llama3.2:latest".to_string(),
        prompt: "Answer from context.".to_string(),
        stream: false,
        options: GenerateOptions { temperature: 0.4 },
    };

    let json = serde_json::to_value(&request).expect("should serialize");

    assert_eq!(json["model"], "llama3.2:latest");
    assert_eq!(json["stream"], false);
    let temperature = json["options"]["temperature"]
        .as_f64()
        .expect("temperature should be a number");
    assert!((temperature - 0.4).abs() < 1e-6);
}
