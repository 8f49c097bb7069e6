//! Line protocol spoken with the model.
//!
//! Replies are free text; only whole lines that start with one of the markers
//! below carry meaning. Matching is exact and case-sensitive.

use serde::{Deserialize, Serialize};

pub const ANSWER_PREFIX: &str = "Respuesta: ";
pub const ACTION_PREFIX: &str = "Acción: ";
pub const OBSERVATION_PREFIX: &str = "Observación: ";

pub const LOOKUP_RESUME: &str = "buscar_cv";
pub const LOOKUP_MANY: &str = "buscar_multi_cv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// `buscar_cv: <name>`
    LookupResume,
    /// `buscar_multi_cv: <name>, <name>, ...`
    LookupMany,
    Unknown(String),
}

impl ActionKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            LOOKUP_RESUME => Self::LookupResume,
            LOOKUP_MANY => Self::LookupMany,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::LookupResume => LOOKUP_RESUME,
            Self::LookupMany => LOOKUP_MANY,
            Self::Unknown(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub argument: String,
}

/// What one model reply asks the loop to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Answer(String),
    Action(Action),
    /// Neither marker present
    Unstructured,
}

/// `Respuesta: <rest>` -> `<rest>`
pub fn parse_answer(line: &str) -> Option<&str> {
    line.strip_prefix(ANSWER_PREFIX)
}

/// `Acción: <word>: <rest>` -> `(<word>, <rest>)`, where `<word>` is one or
/// more alphanumeric or `_` characters.
pub fn parse_action(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix(ACTION_PREFIX)?;

    let word_len = rest
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());

    if word_len == 0 {
        return None;
    }

    let (name, tail) = rest.split_at(word_len);
    let argument = tail.strip_prefix(": ")?;
    Some((name, argument))
}

/// First answer line wins over any action line; otherwise the first action line.
pub fn parse_reply(text: &str) -> Reply {
    if let Some(answer) = text.lines().find_map(parse_answer) {
        return Reply::Answer(answer.to_string());
    }

    match text.lines().find_map(parse_action) {
        Some((name, argument)) => Reply::Action(Action {
            kind: ActionKind::from_name(name),
            argument: argument.to_string(),
        }),
        None => Reply::Unstructured,
    }
}

pub fn observation(result: &str) -> String {
    format!("{}{}", OBSERVATION_PREFIX, result)
}

pub fn unknown_action_observation(name: &str) -> String {
    observation(&format!("Acción '{}' no reconocida. Fin", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        assert_eq!(
            parse_action("Acción: buscar_cv: Juan Perez"),
            Some(("buscar_cv", "Juan Perez"))
        );
        assert_eq!(
            parse_action("Acción: buscar_multi_cv: Juan Perez, Maria Garcia"),
            Some(("buscar_multi_cv", "Juan Perez, Maria Garcia"))
        );
        assert_eq!(parse_action("Acción: buscar_cv: "), Some(("buscar_cv", "")));
    }

    #[test]
    fn test_parse_action_rejects_malformed_lines() {
        // Not anchored at line start
        assert_eq!(parse_action(" Acción: buscar_cv: Juan"), None);
        // Case-sensitive marker
        assert_eq!(parse_action("acción: buscar_cv: Juan"), None);
        // Missing the second separator
        assert_eq!(parse_action("Acción: buscar_cv Juan"), None);
        assert_eq!(parse_action("Acción: buscar cv: Juan"), None);
        // Empty action name
        assert_eq!(parse_action("Acción: : Juan"), None);
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("Respuesta: Tiene 5 años de experiencia."), Some("Tiene 5 años de experiencia."));
        assert_eq!(parse_answer("Respuesta:sin espacio"), None);
        assert_eq!(parse_answer("La Respuesta: no"), None);
    }

    #[test]
    fn test_parse_reply_dispatches_action() {
        let reply = "Pensamiento: x\nAcción: buscar_cv: Juan Perez\nPAUSA";

        assert_eq!(
            parse_reply(reply),
            Reply::Action(Action {
                kind: ActionKind::LookupResume,
                argument: "Juan Perez".to_string(),
            })
        );
    }

    #[test]
    fn test_answer_beats_action() {
        let reply = "Acción: buscar_cv: Juan Perez\nRespuesta: Es ingeniero.\nRespuesta: otra";
        assert_eq!(parse_reply(reply), Reply::Answer("Es ingeniero.".to_string()));
    }

    #[test]
    fn test_first_action_wins_and_unknown_names_survive() {
        let reply = "Acción: llamar: Juan\nAcción: buscar_cv: Juan";
        match parse_reply(reply) {
            Reply::Action(action) => {
                assert_eq!(action.kind, ActionKind::Unknown("llamar".to_string()));
                assert_eq!(action.kind.name(), "llamar");
            }
            other => panic!("expected action, got {:?}", other),
        }
    }

    #[test]
    fn test_unstructured_reply() {
        assert_eq!(parse_reply("No sé de quién hablas."), Reply::Unstructured);
        assert_eq!(parse_reply(""), Reply::Unstructured);
    }

    #[test]
    fn test_observations() {
        assert_eq!(observation("Lima"), "Observación: Lima");
        assert_eq!(
            unknown_action_observation("llamar"),
            "Observación: Acción 'llamar' no reconocida. Fin"
        );
    }
}
