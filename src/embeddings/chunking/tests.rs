use super::*;

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Concatenate the first chunk with each later chunk's post-overlap suffix.
fn reconstruct(chunks: &[TextChunk], overlap: usize) -> String {
    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            text.push_str(&chunk.content);
        } else {
            text.extend(chunk.content.chars().skip(overlap));
        }
    }
    text
}

#[test]
fn short_text_is_single_chunk() {
    let config = ChunkingConfig::default();
    let chunks =
        split_text("category: Visa\nquestion: Do I need a visa?", &config).expect("should split");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].offset, 0);
    assert_eq!(chunks[0].index, 0);
    assert_eq!(chunks[0].content, "category: Visa\nquestion: Do I need a visa?");
}

#[test]
fn empty_text_yields_no_chunks() {
    let config = ChunkingConfig::default();
    assert!(split_text("", &config).expect("should split").is_empty());
}

#[test]
fn chunks_respect_max_size() {
    let config = ChunkingConfig {
        max_size: 50,
        overlap: 10,
    };
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
    let chunks = split_text(&text, &config).expect("should split");

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(char_len(&chunk.content) <= config.max_size);
    }
}

#[test]
fn consecutive_chunks_overlap_exactly() {
    let config = ChunkingConfig {
        max_size: 50,
        overlap: 10,
    };
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
    let chunks = split_text(&text, &config).expect("should split");

    for pair in chunks.windows(2) {
        let prev_tail: String = pair[0]
            .content
            .chars()
            .skip(char_len(&pair[0].content) - config.overlap)
            .collect();
        let next_head: String = pair[1].content.chars().take(config.overlap).collect();
        assert_eq!(prev_tail, next_head);
        assert_eq!(
            pair[1].offset,
            pair[0].offset + char_len(&pair[0].content) - config.overlap
        );
    }
}

#[test]
fn reconstruction_is_lossless() {
    let config = ChunkingConfig {
        max_size: 40,
        overlap: 8,
    };
    let text = "Erasmus exchange students can apply for housing support. \
                Applications open in March.\n\nVisa rules differ by country. \
                EU citizens do not need a visa."
        .to_string();
    let chunks = split_text(&text, &config).expect("should split");

    assert!(chunks.len() > 1);
    assert_eq!(reconstruct(&chunks, config.overlap), text);
}

#[test]
fn reconstruction_is_lossless_for_multibyte_text() {
    let config = ChunkingConfig {
        max_size: 30,
        overlap: 6,
    };
    let text = "Öğrenci değişim programı başvuruları şubat ayında başlar. \
                Vize başvurusu için pasaport gereklidir. Yurt başvurusu ayrıdır."
        .to_string();
    let chunks = split_text(&text, &config).expect("should split");

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(char_len(&chunk.content) <= config.max_size);
    }
    assert_eq!(reconstruct(&chunks, config.overlap), text);
}

#[test]
fn prefers_paragraph_boundary() {
    let config = ChunkingConfig {
        max_size: 60,
        overlap: 5,
    };
    // The blank line sits inside the window, so the first chunk should end
    // right after it instead of at the hard cut.
    let text = format!("{}\n\n{}", "a".repeat(40), "b".repeat(80));
    let chunks = split_text(&text, &config).expect("should split");

    assert!(chunks[0].content.ends_with("\n\n"));
    assert_eq!(char_len(&chunks[0].content), 42);
}

#[test]
fn prefers_sentence_boundary_over_word() {
    let config = ChunkingConfig {
        max_size: 40,
        overlap: 5,
    };
    let text = "First sentence here. Second part continues with more words after that";
    let chunks = split_text(text, &config).expect("should split");

    assert!(chunks[0].content.ends_with(". "));
}

#[test]
fn falls_back_to_hard_cut_without_boundaries() {
    let config = ChunkingConfig {
        max_size: 20,
        overlap: 4,
    };
    let text = "x".repeat(50);
    let chunks = split_text(&text, &config).expect("should split");

    assert_eq!(char_len(&chunks[0].content), 20);
    assert_eq!(chunks[1].offset, 16);
    assert_eq!(reconstruct(&chunks, config.overlap), text);
}

#[test]
fn overlap_not_below_max_size_is_rejected() {
    let text = "some text to split";

    for (max_size, overlap) in [(100, 100), (100, 150)] {
        let config = ChunkingConfig { max_size, overlap };
        match split_text(text, &config) {
            Err(RagError::Ingestion(msg)) => {
                assert!(msg.contains(&overlap.to_string()));
                assert!(msg.contains(&max_size.to_string()));
            }
            other => panic!("expected ingestion error, got {:?}", other),
        }
    }
}

#[test]
fn offsets_and_indices_are_sequential() {
    let config = ChunkingConfig {
        max_size: 30,
        overlap: 6,
    };
    let text = "word ".repeat(50);
    let chunks = split_text(&text, &config).expect("should split");

    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i);
    }
    assert_eq!(chunks[0].offset, 0);
}
