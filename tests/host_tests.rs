use serde_json::{json, Value};
use std::sync::Arc;
use tutor_translate_lib::mock::MockProvider;
use tutor_translate_lib::{
    CapturedContent, Host, Message, Mode, ProviderFormat, ProviderKind, Reply, Settings,
};

fn mock_host(mock: MockProvider) -> (Host, Arc<MockProvider>) {
    let mock = Arc::new(mock);
    (Host::with_provider(Settings::default(), mock.clone()), mock)
}

#[tokio::test]
async fn test_process_input_returns_structured_result() {
    let (host, mock) = mock_host(MockProvider::new(ProviderFormat::StructuredJson).with_reply(
        "```json\n{\"mode\":\"translator\",\"translations\":{\"Greek\":\"Χαίρετε\",}}\n```",
    ));

    let reply = host
        .dispatch(Message::ProcessInput {
            user_input: "Hello".into(),
            source_language: "English".into(),
            target_languages: vec!["Greek".into()],
            is_tutor_mode: false,
        })
        .await;

    match reply {
        Reply::Translation(result) => {
            assert_eq!(result.mode, Mode::Translator);
            assert_eq!(result.translations["Greek"], "Χαίρετε");
        }
        other => panic!("unexpected reply: {:?}", other),
    }
    let prompt = mock.bodies()[0]["prompt"].as_str().unwrap().to_string();
    assert!(prompt.contains("Target Languages: Greek"));
}

#[tokio::test]
async fn test_json_round_trip_through_host() {
    let (host, _) = mock_host(MockProvider::new(ProviderFormat::PlainInstruction).with_reply(
        r#"{"mode":"tutor","corrected_text":"I am happy","translations":{"Greek":"Είμαι χαρούμενος"}}"#,
    ));

    let line = json!({
        "action": "processInput",
        "userInput": "I are happy",
        "sourceLanguage": "English",
        "targetLanguages": ["Greek"],
        "isTutorMode": true
    })
    .to_string();
    let reply: Value = serde_json::from_str(&host.handle_json(&line).await).unwrap();

    assert_eq!(
        reply,
        json!({
            "mode": "tutor",
            "corrected_text": "I am happy",
            "translations": {"Greek": "Είμαι χαρούμενος"}
        })
    );
}

#[tokio::test]
async fn test_missing_targets_become_error_reply() {
    let (host, mock) = mock_host(MockProvider::new(ProviderFormat::StructuredJson));

    let reply = host
        .dispatch(Message::ProcessInput {
            user_input: "Hello".into(),
            source_language: "English".into(),
            target_languages: vec![],
            is_tutor_mode: false,
        })
        .await;

    assert_eq!(reply, Reply::error("Please select at least one target language."));
    assert!(mock.bodies().is_empty());
}

#[tokio::test]
async fn test_missing_credentials_become_error_reply() {
    let host = Host::new(Settings::default());

    let reply = host
        .dispatch(Message::ReverseCheck {
            text_to_translate: "Γεια".into(),
        })
        .await;

    assert_eq!(
        reply,
        Reply::error(
            "Please set your Gemini API key in the options page to use the reverse check function."
        )
    );
}

#[tokio::test]
async fn test_reverse_check_reply() {
    let (host, _) = mock_host(
        MockProvider::new(ProviderFormat::StructuredJson).with_reply("  Hello there!  "),
    );

    let reply = host
        .dispatch(Message::ReverseCheck {
            text_to_translate: "Χαίρετε".into(),
        })
        .await;

    assert_eq!(reply, Reply::Text { text: "Hello there!".into() });
}

#[tokio::test]
async fn test_api_with_incomplete_openai_settings() {
    let host = Host::new(Settings::default());

    let reply = host
        .dispatch(Message::TestApi {
            provider: ProviderKind::OpenAi,
            api_key: "sk-test".into(),
            url: String::new(),
            model: "gpt-4o-mini".into(),
        })
        .await;

    match reply {
        Reply::Test { success, error, .. } => {
            assert!(!success);
            assert_eq!(
                error.as_deref(),
                Some("Please fill in all OpenAI-compatible interface settings.")
            );
        }
        other => panic!("unexpected reply: {:?}", other),
    }
    assert_eq!(host.settings(), Settings::default());
}

#[tokio::test]
async fn test_api_success() {
    let (host, _) = mock_host(MockProvider::new(ProviderFormat::PlainInstruction).with_reply("OK."));

    let reply = host
        .dispatch(Message::TestApi {
            provider: ProviderKind::Gemini,
            api_key: "key".into(),
            url: String::new(),
            model: String::new(),
        })
        .await;

    assert_eq!(
        reply,
        Reply::Test {
            success: true,
            message: Some("API configuration successful!".into()),
            error: None,
        }
    );
}

#[tokio::test]
async fn test_capture_content_is_kept() {
    let host = Host::new(Settings::default());
    assert_eq!(host.captured(), None);

    let content = CapturedContent {
        text: "Selected paragraph".into(),
        url: "https://example.test/article".into(),
        title: "Article".into(),
    };
    let reply = host.dispatch(Message::CaptureContent(content.clone())).await;

    assert_eq!(reply, Reply::Ack { ok: true });
    assert_eq!(host.captured(), Some(content));
}

#[tokio::test]
async fn test_api_without_gemini_key() {
    let host = Host::new(Settings::default());

    let reply = host
        .dispatch(Message::TestApi {
            provider: ProviderKind::Gemini,
            api_key: "  ".into(),
            url: String::new(),
            model: String::new(),
        })
        .await;

    assert_eq!(
        reply,
        Reply::Test {
            success: false,
            message: None,
            error: Some("Please enter your Gemini API key.".into()),
        }
    );
}

#[tokio::test]
async fn test_capture_translates_with_saved_preferences() {
    let mock = Arc::new(MockProvider::new(ProviderFormat::StructuredJson).with_reply(
        r#"{"mode":"tutor","corrected_text":"I am happy","translations":{"Greek":"Είμαι χαρούμενος"}}"#,
    ));
    let settings = Settings {
        target_languages: vec!["Greek".into()],
        tutor_mode: true,
        ..Settings::default()
    };
    let host = Host::with_provider(settings, mock.clone());

    let reply = host
        .dispatch(Message::CaptureContent(CapturedContent {
            text: "I are happy".into(),
            url: "https://example.test".into(),
            title: "Example".into(),
        }))
        .await;

    match reply {
        Reply::Translation(result) => {
            assert_eq!(result.mode, Mode::Tutor);
            assert_eq!(result.corrected_text.as_deref(), Some("I am happy"));
        }
        other => panic!("unexpected reply: {:?}", other),
    }
    assert_eq!(host.captured().unwrap().text, "I are happy");
    let prompt = mock.bodies()[0]["prompt"].as_str().unwrap().to_string();
    assert!(prompt.contains("**MODE: AI TUTOR**"));
    assert!(prompt.contains("I are happy"));
}

#[tokio::test]
async fn test_capture_failure_becomes_error_reply() {
    let mock = Arc::new(
        MockProvider::new(ProviderFormat::StructuredJson).with_error("Unable to connect to Mock API"),
    );
    let settings = Settings {
        target_languages: vec!["Greek".into()],
        ..Settings::default()
    };
    let host = Host::with_provider(settings, mock);

    let reply = host
        .dispatch(Message::CaptureContent(CapturedContent {
            text: "Hello".into(),
            ..CapturedContent::default()
        }))
        .await;

    assert_eq!(reply, Reply::error("Unable to connect to Mock API"));
}

#[tokio::test]
async fn test_process_input_remembers_preferences() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let mock = Arc::new(MockProvider::new(ProviderFormat::StructuredJson).with_reply(
        r#"{"mode":"translator","translations":{"French":"Bonjour","German":"Hallo"}}"#,
    ));
    let host = Host::with_provider(Settings::default(), mock).with_config_path(&path);

    let reply = host
        .dispatch(Message::ProcessInput {
            user_input: "Hola".into(),
            source_language: "Spanish".into(),
            target_languages: vec!["French".into(), "German".into()],
            is_tutor_mode: true,
        })
        .await;
    assert!(!reply.is_error());

    let settings = host.settings();
    assert_eq!(settings.source_language, "Spanish");
    assert_eq!(settings.target_languages, vec!["French", "German"]);
    assert!(settings.tutor_mode);
    assert_eq!(tutor_translate_lib::config::load_from(&path).unwrap(), settings);
}

#[tokio::test]
async fn test_failed_request_leaves_preferences() {
    let (host, _) = mock_host(
        MockProvider::new(ProviderFormat::StructuredJson).with_error("Unable to connect to Mock API"),
    );

    let reply = host
        .dispatch(Message::ProcessInput {
            user_input: "Hola".into(),
            source_language: "Spanish".into(),
            target_languages: vec!["French".into()],
            is_tutor_mode: false,
        })
        .await;

    assert!(reply.is_error());
    assert_eq!(host.settings(), Settings::default());
}

#[tokio::test]
async fn test_malformed_message() {
    let host = Host::new(Settings::default());
    let reply: Value = serde_json::from_str(&host.handle_json("{\"action\":\"dance\"}").await).unwrap();
    assert!(reply["error"].as_str().unwrap().starts_with("Unknown message"));
}
