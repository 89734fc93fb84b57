// Turn assembly from interleaved transcript fragments
//
// For any sequence of partial fragments followed by a turn-complete marker,
// each turn's text is the ordered concatenation of its fragments, and at
// most one turn per speaker is open at a time.

use lingua_live::services::{GrammarVerdict, PronunciationReport};
use lingua_live::{Speaker, TurnLedger};

#[test]
fn test_turn_text_is_ordered_concatenation() {
    let mut ledger = TurnLedger::new();

    let fragments = ["Vorrei ", "prenotare ", "un ", "tavolo"];
    let mut owner = None;
    for fragment in fragments {
        let id = ledger.append_fragment(Speaker::Learner, fragment);
        if let Some(previous) = owner {
            assert_eq!(previous, id, "fragments land in the same open turn");
        }
        owner = Some(id);
    }

    let completed = ledger.complete_open_turns();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].text, fragments.concat());
}

#[test]
fn test_interleaved_speakers_stay_separate() {
    let mut ledger = TurnLedger::new();

    // Fragments from both speakers interleave arbitrarily
    ledger.append_fragment(Speaker::Tutor, "Benvenuto! ");
    ledger.append_fragment(Speaker::Learner, "Grazie, ");
    ledger.append_fragment(Speaker::Tutor, "Cosa posso ");
    ledger.append_fragment(Speaker::Learner, "molto gentile");
    ledger.append_fragment(Speaker::Tutor, "portarle?");

    assert_eq!(ledger.len(), 2, "exactly one open turn per speaker");

    ledger.complete_open_turns();

    let texts: Vec<&str> = ledger.turns().iter().map(|t| t.text.as_str()).collect();
    assert!(texts.contains(&"Benvenuto! Cosa posso portarle?"));
    assert!(texts.contains(&"Grazie, molto gentile"));
}

#[test]
fn test_fragments_after_complete_open_new_turns() {
    let mut ledger = TurnLedger::new();

    let first = ledger.append_fragment(Speaker::Tutor, "Prego.");
    ledger.complete_open_turns();

    let second = ledger.append_fragment(Speaker::Tutor, "Altro?");

    assert_ne!(first, second);
    assert_eq!(ledger.len(), 2);
    assert!(!ledger.get(first).unwrap().streaming);
    assert!(ledger.get(second).unwrap().streaming);
}

#[test]
fn test_annotations_resolve_by_turn_identity() {
    let mut ledger = TurnLedger::new();

    let voiced = ledger.append_fragment(Speaker::Learner, "io ha fame");
    ledger.complete_open_turns();

    // Several newer turns pile up before the annotations land
    for _ in 0..3 {
        ledger.append_fragment(Speaker::Learner, "altro testo");
        ledger.complete_open_turns();
    }

    assert!(ledger.attach_grammar(
        voiced,
        GrammarVerdict {
            correct: false,
            corrected: Some("io ho fame".to_string()),
            explanation: Some("First person of avere is ho.".to_string()),
        },
    ));
    assert!(ledger.attach_pronunciation(
        voiced,
        PronunciationReport {
            score: 74,
            feedback: "Vowels are clear.".to_string(),
            flagged_words: vec![],
        },
    ));

    let turn = ledger.get(voiced).unwrap();
    assert_eq!(turn.grammar.as_ref().unwrap().corrected.as_deref(), Some("io ho fame"));
    assert_eq!(turn.pronunciation.as_ref().unwrap().score, 74);

    // No other turn picked up the annotations
    let annotated = ledger.turns().iter().filter(|t| t.is_annotated()).count();
    assert_eq!(annotated, 1);
}
