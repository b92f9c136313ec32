//! HTTP client tests against a mocked engine
//!
//! These tests verify the request shapes sent to each engine endpoint and
//! how non-success responses are reported.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use yomiage::speech::{
    preview_voice, resolve_style_id, synthesize, HttpSpeechClient, SpeechApi, PREVIEW_TEXT,
};
use yomiage::YomiageError;

const ANNELI_NORMAL: u64 = 888753760;

async fn engine() -> (MockServer, HttpSpeechClient) {
    let server = MockServer::start().await;
    let client = HttpSpeechClient::with_base_url(format!("{}/", server.uri())).unwrap();
    (server, client)
}

async fn mount_speakers(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/speakers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "name": "Anneli",
                "speaker_uuid": "e756b8e4-b606-4e15-99b1-3f9c6a1b2317",
                "styles": [
                    {"name": "ノーマル", "id": ANNELI_NORMAL, "type": "talk"},
                    {"name": "上機嫌", "id": 888753761, "type": "talk"}
                ],
                "version": "1.0.0"
            }
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_speakers_and_resolution() {
    let (server, client) = engine().await;
    mount_speakers(&server).await;

    let speakers = client.speakers().await.unwrap();
    assert_eq!(speakers.len(), 1);
    assert_eq!(speakers[0].styles.len(), 2);

    let id = resolve_style_id(&client, "Anneli", "ノーマル").await.unwrap();
    assert_eq!(id, ANNELI_NORMAL);

    let err = resolve_style_id(&client, "Anneli", "ささやき").await.unwrap_err();
    assert!(matches!(err, YomiageError::VoiceNotFound { .. }));
}

#[tokio::test]
async fn test_initialize_speaker_query() {
    let (server, client) = engine().await;
    Mock::given(method("POST"))
        .and(path("/initialize_speaker"))
        .and(query_param("speaker", ANNELI_NORMAL.to_string()))
        .and(query_param("skip_reinit", "false"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.initialize_speaker(ANNELI_NORMAL).await.unwrap();
}

#[tokio::test]
async fn test_synthesize_overrides_speed() {
    let (server, client) = engine().await;
    let wav = vec![b'R', b'I', b'F', b'F', 0, 0, 0, 0];

    Mock::given(method("POST"))
        .and(path("/audio_query"))
        .and(query_param("text", "こんにちは"))
        .and(query_param("speaker", ANNELI_NORMAL.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accent_phrases": [],
            "speedScale": 1.0,
            "pitchScale": 0.0
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/synthesis"))
        .and(query_param("speaker", ANNELI_NORMAL.to_string()))
        .and(body_partial_json(json!({"speedScale": 1.3, "pitchScale": 0.0})))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(wav.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let audio = synthesize(&client, "こんにちは", ANNELI_NORMAL, 1.3).await.unwrap();
    assert_eq!(audio, wav);
}

#[tokio::test]
async fn test_preview_runs_full_exchange() {
    let (server, client) = engine().await;
    mount_speakers(&server).await;

    Mock::given(method("POST"))
        .and(path("/initialize_speaker"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/audio_query"))
        .and(query_param("text", PREVIEW_TEXT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"speedScale": 1.0})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/synthesis"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
        .mount(&server)
        .await;

    let audio = preview_voice(&client, "Anneli", "ノーマル", 1.0).await.unwrap();
    assert_eq!(audio, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_error_status_is_service_unavailable() {
    let (server, client) = engine().await;
    Mock::given(method("POST"))
        .and(path("/audio_query"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = synthesize(&client, "テスト", ANNELI_NORMAL, 1.0).await.unwrap_err();
    assert!(
        matches!(err, YomiageError::ServiceUnavailable(_)),
        "HTTP 500 should map to ServiceUnavailable, got {err:?}"
    );
}

#[tokio::test]
async fn test_unreachable_engine() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = HttpSpeechClient::with_base_url(uri).unwrap();
    let err = client.speakers().await.unwrap_err();
    assert!(matches!(err, YomiageError::ServiceUnavailable(_)));
    assert_eq!(err.user_message(), yomiage::SERVICE_DOWN_MESSAGE);
}
