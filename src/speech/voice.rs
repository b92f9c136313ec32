//! Speaker catalog types and voice resolution

use crate::speech::client::{synthesize, SpeechApi};
use crate::{Result, YomiageError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Numeric style id understood by the engine's synthesis endpoints
pub type StyleId = u64;

/// One style of a speaker, as listed by `GET /speakers`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerStyle {
    pub name: String,
    pub id: StyleId,
}

/// One voice persona, as listed by `GET /speakers`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speaker {
    pub name: String,
    #[serde(default)]
    pub styles: Vec<SpeakerStyle>,
}

impl Speaker {
    pub fn style(&self, name: &str) -> Option<&SpeakerStyle> {
        self.styles.iter().find(|s| s.name == name)
    }
}

/// Look up a style id by exact speaker name, then exact style name.
pub fn find_style_id(speakers: &[Speaker], speaker: &str, style: &str) -> Result<StyleId> {
    speakers
        .iter()
        .find(|s| s.name == speaker)
        .and_then(|s| s.style(style))
        .map(|s| s.id)
        .ok_or_else(|| YomiageError::VoiceNotFound {
            speaker: speaker.to_string(),
            style: style.to_string(),
        })
}

/// Query the engine's catalog and resolve a speaker/style pair.
pub async fn resolve_style_id(api: &dyn SpeechApi, speaker: &str, style: &str) -> Result<StyleId> {
    let speakers = api.speakers().await?;
    let id = find_style_id(&speakers, speaker, style)?;
    debug!("Resolved voice {}/{} to style id {}", speaker, style, id);
    Ok(id)
}

/// Phrase synthesized when previewing a voice
pub const PREVIEW_TEXT: &str = "テストです";

/// Pick a style of `speaker`: the named one, or its first style when `style`
/// is `None`.
pub fn choose_style<'a>(
    speakers: &'a [Speaker],
    speaker: &str,
    style: Option<&str>,
) -> Result<&'a SpeakerStyle> {
    let not_found = || YomiageError::VoiceNotFound {
        speaker: speaker.to_string(),
        style: style.unwrap_or_default().to_string(),
    };

    let entry = speakers.iter().find(|s| s.name == speaker).ok_or_else(not_found)?;
    match style {
        Some(name) => entry.style(name).ok_or_else(not_found),
        None => entry.styles.first().ok_or_else(not_found),
    }
}

/// Resolve, preload and synthesize [`PREVIEW_TEXT`] with the given voice.
pub async fn preview_voice(
    api: &dyn SpeechApi,
    speaker: &str,
    style: &str,
    speed: f64,
) -> Result<Vec<u8>> {
    let style_id = resolve_style_id(api, speaker, style).await?;
    api.initialize_speaker(style_id).await?;
    synthesize(api, PREVIEW_TEXT, style_id, speed).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Speaker> {
        serde_json::from_str(
            r#"[
                {"name": "Anneli", "speaker_uuid": "e756b8e4", "styles": [
                    {"name": "ノーマル", "id": 888753760, "type": "talk"},
                    {"name": "上機嫌", "id": 888753761}
                ]},
                {"name": "Other", "styles": [{"name": "ノーマル", "id": 1}]}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_find_existing_style() {
        assert_eq!(find_style_id(&catalog(), "Anneli", "ノーマル").unwrap(), 888753760);
        assert_eq!(find_style_id(&catalog(), "Other", "ノーマル").unwrap(), 1);
    }

    #[test]
    fn test_missing_style_is_voice_not_found() {
        let err = find_style_id(&catalog(), "Anneli", "ささやき").unwrap_err();
        match err {
            YomiageError::VoiceNotFound { speaker, style } => {
                assert_eq!(speaker, "Anneli");
                assert_eq!(style, "ささやき");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_choose_style_defaults_to_first() {
        let speakers = catalog();
        assert_eq!(choose_style(&speakers, "Anneli", None).unwrap().id, 888753760);
        assert_eq!(choose_style(&speakers, "Anneli", Some("上機嫌")).unwrap().id, 888753761);
        assert!(choose_style(&speakers, "Anneli", Some("ささやき")).is_err());
        assert!(choose_style(&speakers, "Nobody", None).is_err());

        let empty = vec![Speaker {
            name: "Mute".into(),
            styles: Vec::new(),
        }];
        assert!(choose_style(&empty, "Mute", None).is_err());
    }

    #[test]
    fn test_missing_speaker_is_voice_not_found() {
        assert!(matches!(
            find_style_id(&catalog(), "anneli", "ノーマル"),
            Err(YomiageError::VoiceNotFound { .. })
        ));
    }
}
