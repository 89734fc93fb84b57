use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::{GrammarVerdict, PronunciationReport};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Learner,
    Tutor,
}

/// One contiguous utterance by the learner or the tutor
///
/// Created when the first transcript fragment arrives (or on an explicit
/// text send), grows while fragments stream in, and is finalized by the
/// turn-complete marker. Annotations attach later, matched by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub speaker: Speaker,
    /// Text content; ordered concatenation of received fragments
    pub text: String,
    /// True while fragments may still arrive
    pub streaming: bool,
    pub started_at: DateTime<Utc>,
    /// WAV payload of the learner's recorded utterance, kept for replay
    /// and pronunciation scoring
    #[serde(skip)]
    pub audio_wav: Option<Vec<u8>>,
    /// Whether recorded audio is attached (survives serialization)
    pub has_audio: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar: Option<GrammarVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<PronunciationReport>,
}

impl Turn {
    fn open(speaker: Speaker, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker,
            text,
            streaming: true,
            started_at: Utc::now(),
            audio_wav: None,
            has_audio: false,
            grammar: None,
            pronunciation: None,
        }
    }

    pub fn is_annotated(&self) -> bool {
        self.grammar.is_some() || self.pronunciation.is_some()
    }
}

/// A turn that was just finalized by a turn-complete marker
#[derive(Debug, Clone)]
pub struct CompletedTurn {
    pub id: Uuid,
    pub speaker: Speaker,
    pub text: String,
}

/// Ordered record of all turns in one chat
///
/// Maintains the invariant that at most one turn per speaker is open
/// (streaming) at a time. Everything is looked up by turn id; late
/// annotation results never guess at "the current turn".
#[derive(Debug, Default)]
pub struct TurnLedger {
    turns: Vec<Turn>,
    open_learner: Option<Uuid>,
    open_tutor: Option<Uuid>,
}

impl TurnLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transcript fragment to the speaker's open turn, opening a
    /// new one if none is open. Returns the owning turn's id.
    pub fn append_fragment(&mut self, speaker: Speaker, fragment: &str) -> Uuid {
        if let Some(id) = self.open_id(speaker) {
            if let Some(turn) = self.turn_mut(id) {
                turn.text.push_str(fragment);
                return id;
            }
        }

        self.open_turn_with(speaker, fragment.to_string())
    }

    /// Explicitly open a fresh turn for the speaker (recording start)
    ///
    /// Any previously open turn for the speaker is finalized first.
    pub fn open_turn(&mut self, speaker: Speaker) -> Uuid {
        if let Some(id) = self.open_id(speaker) {
            if let Some(turn) = self.turn_mut(id) {
                turn.streaming = false;
            }
        }

        self.open_turn_with(speaker, String::new())
    }

    /// Record a complete turn that needs no streaming phase (text sends)
    pub fn push_completed(&mut self, speaker: Speaker, text: String) -> Uuid {
        let mut turn = Turn::open(speaker, text);
        turn.streaming = false;
        let id = turn.id;
        self.turns.push(turn);
        id
    }

    /// Finalize all open turns (turn-complete marker)
    pub fn complete_open_turns(&mut self) -> Vec<CompletedTurn> {
        let mut completed = Vec::new();

        for slot in [&mut self.open_learner, &mut self.open_tutor] {
            if let Some(id) = slot.take() {
                if let Some(turn) = self.turns.iter_mut().find(|t| t.id == id) {
                    turn.streaming = false;
                    completed.push(CompletedTurn {
                        id: turn.id,
                        speaker: turn.speaker,
                        text: turn.text.clone(),
                    });
                }
            }
        }

        completed
    }

    /// Attach the recorded utterance payload to a turn. Returns false if
    /// the turn no longer exists.
    pub fn attach_audio(&mut self, id: Uuid, wav: Vec<u8>) -> bool {
        match self.turn_mut(id) {
            Some(turn) => {
                turn.audio_wav = Some(wav);
                turn.has_audio = true;
                true
            }
            None => false,
        }
    }

    pub fn attach_grammar(&mut self, id: Uuid, verdict: GrammarVerdict) -> bool {
        match self.turn_mut(id) {
            Some(turn) => {
                turn.grammar = Some(verdict);
                true
            }
            None => false,
        }
    }

    pub fn attach_pronunciation(&mut self, id: Uuid, report: PronunciationReport) -> bool {
        match self.turn_mut(id) {
            Some(turn) => {
                turn.pronunciation = Some(report);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == id)
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn open_id(&self, speaker: Speaker) -> Option<Uuid> {
        match speaker {
            Speaker::Learner => self.open_learner,
            Speaker::Tutor => self.open_tutor,
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn annotated_count(&self) -> usize {
        self.turns.iter().filter(|t| t.is_annotated()).count()
    }

    fn open_turn_with(&mut self, speaker: Speaker, text: String) -> Uuid {
        let turn = Turn::open(speaker, text);
        let id = turn.id;
        self.turns.push(turn);

        match speaker {
            Speaker::Learner => self.open_learner = Some(id),
            Speaker::Tutor => self.open_tutor = Some(id),
        }

        id
    }

    fn turn_mut(&mut self, id: Uuid) -> Option<&mut Turn> {
        self.turns.iter_mut().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_concatenate_in_order() {
        let mut ledger = TurnLedger::new();

        let a = ledger.append_fragment(Speaker::Tutor, "Buon");
        let b = ledger.append_fragment(Speaker::Tutor, "giorno");
        let c = ledger.append_fragment(Speaker::Tutor, "!");

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(ledger.get(a).unwrap().text, "Buongiorno!");
        assert!(ledger.get(a).unwrap().streaming);
    }

    #[test]
    fn test_one_open_turn_per_speaker() {
        let mut ledger = TurnLedger::new();

        let tutor = ledger.append_fragment(Speaker::Tutor, "Ciao ");
        let learner = ledger.append_fragment(Speaker::Learner, "Vorrei ");
        ledger.append_fragment(Speaker::Tutor, "a tutti");
        ledger.append_fragment(Speaker::Learner, "un caffè");

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.open_id(Speaker::Tutor), Some(tutor));
        assert_eq!(ledger.open_id(Speaker::Learner), Some(learner));
        assert_eq!(ledger.get(tutor).unwrap().text, "Ciao a tutti");
        assert_eq!(ledger.get(learner).unwrap().text, "Vorrei un caffè");
    }

    #[test]
    fn test_complete_finalizes_all_open_turns() {
        let mut ledger = TurnLedger::new();

        ledger.append_fragment(Speaker::Tutor, "Come va?");
        ledger.append_fragment(Speaker::Learner, "Bene, grazie");

        let completed = ledger.complete_open_turns();
        assert_eq!(completed.len(), 2);
        assert_eq!(ledger.open_id(Speaker::Tutor), None);
        assert_eq!(ledger.open_id(Speaker::Learner), None);
        assert!(ledger.turns().iter().all(|t| !t.streaming));

        // Next fragment opens a fresh turn
        let next = ledger.append_fragment(Speaker::Tutor, "Ottimo!");
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.get(next).unwrap().text, "Ottimo!");
    }

    #[test]
    fn test_annotations_attach_by_id_after_finalize() {
        let mut ledger = TurnLedger::new();

        let first = ledger.append_fragment(Speaker::Learner, "io andare al mercato");
        ledger.complete_open_turns();

        // A newer learner turn opens before the annotation lands
        let second = ledger.append_fragment(Speaker::Learner, "dov'è la stazione?");

        let attached = ledger.attach_grammar(
            first,
            GrammarVerdict {
                correct: false,
                corrected: Some("io vado al mercato".to_string()),
                explanation: Some("Conjugate andare in the present tense.".to_string()),
            },
        );

        assert!(attached);
        assert!(ledger.get(first).unwrap().grammar.is_some());
        assert!(ledger.get(second).unwrap().grammar.is_none());
    }

    #[test]
    fn test_attach_to_missing_turn_reports_false() {
        let mut ledger = TurnLedger::new();
        assert!(!ledger.attach_audio(Uuid::new_v4(), vec![1, 2, 3]));
    }

    #[test]
    fn test_open_turn_supersedes_previous() {
        let mut ledger = TurnLedger::new();

        let stale = ledger.append_fragment(Speaker::Learner, "ehm");
        let fresh = ledger.open_turn(Speaker::Learner);

        assert_ne!(stale, fresh);
        assert!(!ledger.get(stale).unwrap().streaming);
        assert_eq!(ledger.open_id(Speaker::Learner), Some(fresh));
    }

    #[test]
    fn test_push_completed_is_final_immediately() {
        let mut ledger = TurnLedger::new();

        let id = ledger.push_completed(Speaker::Learner, "Vorrei un cornetto".to_string());

        assert!(!ledger.get(id).unwrap().streaming);
        assert_eq!(ledger.open_id(Speaker::Learner), None);
    }
}
