use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::image::{self, InlineImage};
use crate::models::{Message, Role};

/// One role-tagged turn in a completion request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineImage>,
}

impl Part {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    pub fn inline_image(image: InlineImage) -> Self {
        Self {
            text: None,
            inline_data: Some(image),
        }
    }
}

/// Instruction conditioning the current turn on the selected role.
/// Applied to the outgoing turn only; historical turns keep the text
/// they were sent with.
fn role_instruction(role: &str) -> String {
    format!(
        "System Instruction: You are an expert {role}. Output your response focusing on {role} specific insights, best practices, and terminology."
    )
}

/// Builds the ordered turn list for one request: every previously
/// committed message first, then the role-conditioned current user turn.
///
/// Stored images are re-hydrated into inline parts. A stored payload
/// that no longer parses is dropped from its turn with a warning; the
/// turn's text still goes out.
pub fn build_contents(
    history: &[Message],
    role: &str,
    text: &str,
    attachment: Option<InlineImage>,
) -> Vec<Content> {
    let mut contents: Vec<Content> = history
        .iter()
        .filter(|message| !message.is_thinking())
        .map(|message| {
            let mut parts = vec![Part::text(&message.content)];
            if let Some(url) = &message.image {
                match image::parse_data_url(url) {
                    Ok(inline) => parts.push(Part::inline_image(inline)),
                    Err(e) => warn!("Dropping stored image from outgoing turn: {}", e),
                }
            }
            Content {
                role: message.role,
                parts,
            }
        })
        .collect();

    let prompt = format!("{}\n\nUser Query: {}", role_instruction(role), text);
    let mut parts = vec![Part::text(&prompt)];
    if let Some(inline) = attachment {
        parts.push(Part::inline_image(inline));
    }
    contents.push(Content {
        role: Role::User,
        parts,
    });

    contents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::image::{to_data_url, to_inline};
    use crate::models::Attachment;

    fn attachment() -> Attachment {
        Attachment {
            mime_type: "image/jpeg".to_string(),
            data: vec![1, 2, 3, 4],
        }
    }

    #[test]
    fn current_turn_is_role_conditioned_and_last() {
        let history = vec![Message::user("earlier", None), Message::model("reply")];
        let contents = build_contents(&history, "DevOps", "deploy it", None);

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0].parts[0].text.as_deref(), Some("earlier"));
        assert_eq!(contents[1].role, Role::Model);

        let last = contents.last().unwrap();
        assert_eq!(last.role, Role::User);
        let prompt = last.parts[0].text.as_deref().unwrap();
        assert!(prompt.starts_with("System Instruction: You are an expert DevOps."));
        assert!(prompt.ends_with("User Query: deploy it"));
    }

    #[test]
    fn history_turns_are_not_reconditioned() {
        let history = vec![Message::user("plain question", None)];
        let contents = build_contents(&history, "Front End", "next", None);
        assert_eq!(contents[0].parts[0].text.as_deref(), Some("plain question"));
    }

    #[test]
    fn stored_image_is_rehydrated_with_original_media_type() {
        let url = to_data_url(&attachment());
        let history = vec![Message::user("look at this", Some(url))];
        let contents = build_contents(&history, "Fullstack", "and now?", None);

        assert_eq!(contents[0].parts.len(), 2);
        let inline = contents[0].parts[1].inline_data.as_ref().unwrap();
        assert_eq!(inline.mime_type, "image/jpeg");
        assert_eq!(*inline, to_inline(&attachment()));
    }

    #[test]
    fn malformed_stored_image_is_skipped_without_dropping_the_turn() {
        let history = vec![Message::user("broken", Some("data:;base64,????".to_string()))];
        let contents = build_contents(&history, "Fullstack", "still send", None);

        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].parts.len(), 1);
        assert_eq!(contents[0].parts[0].text.as_deref(), Some("broken"));
    }

    #[test]
    fn thinking_placeholder_never_reaches_the_wire() {
        let history = vec![Message::user("hi", None), Message::thinking()];
        let contents = build_contents(&history, "Fullstack", "next", None);
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].parts[0].text.as_deref(), Some("hi"));
    }

    #[test]
    fn current_attachment_is_appended_to_the_final_turn() {
        let contents = build_contents(&[], "Fullstack", "see image", Some(to_inline(&attachment())));
        let last = contents.last().unwrap();
        assert_eq!(last.parts.len(), 2);
        assert!(last.parts[1].inline_data.is_some());
    }

    #[test]
    fn wire_shape_uses_camel_case_inline_data() {
        let contents = build_contents(&[], "Fullstack", "hi", Some(to_inline(&attachment())));
        let json = serde_json::to_value(&contents).unwrap();
        let part = &json[0]["parts"][1];
        assert!(part.get("inlineData").is_some());
        assert!(part["inlineData"].get("mimeType").is_some());
        assert!(part.get("text").is_none());
    }
}
