//! Tests for the provider catalog

use super::*;

#[test]
fn test_resolve_every_alias() {
    let cases = [
        ("openai", ProviderId::OpenAI),
        ("deepseek", ProviderId::DeepSeek),
        ("gemini", ProviderId::Gemini),
        ("grok", ProviderId::Grok),
        ("xai", ProviderId::Grok),
        ("anthropic", ProviderId::Anthropic),
        ("claude", ProviderId::Anthropic),
    ];

    for (name, expected) in cases {
        let config = resolve(name).unwrap();
        assert_eq!(config.id, expected, "alias {}", name);
    }
}

#[test]
fn test_resolve_is_case_insensitive() {
    assert_eq!(resolve("OpenAI").unwrap().id, ProviderId::OpenAI);
    assert_eq!(resolve("XAI").unwrap().id, ProviderId::Grok);
    assert_eq!(resolve("Claude").unwrap().id, ProviderId::Anthropic);
    assert_eq!(resolve("  gemini ").unwrap().id, ProviderId::Gemini);
}

#[test]
fn test_aliases_share_one_config() {
    assert!(std::ptr::eq(resolve("grok").unwrap(), resolve("xai").unwrap()));
    assert!(std::ptr::eq(
        resolve("anthropic").unwrap(),
        resolve("claude").unwrap()
    ));
}

#[test]
fn test_resolve_unknown_provider() {
    for name in ["mistral", "", "open-ai", "gpt"] {
        match resolve(name) {
            Err(Error::UnsupportedProvider(n)) => assert_eq!(n, name),
            other => panic!("expected UnsupportedProvider for {:?}, got {:?}", name, other),
        }
    }
}

#[test]
fn test_auth_styles() {
    for name in ["openai", "deepseek", "grok", "xai"] {
        assert_eq!(resolve(name).unwrap().auth_style, AuthStyle::BearerHeader);
    }

    assert_eq!(
        resolve("gemini").unwrap().auth_style,
        AuthStyle::QueryParam { name: "key" }
    );

    for name in ["anthropic", "claude"] {
        match resolve(name).unwrap().auth_style {
            AuthStyle::CustomHeaderPair {
                key_header,
                version_header,
                ..
            } => {
                assert_eq!(key_header, "x-api-key");
                assert_eq!(version_header, "anthropic-version");
            }
            other => panic!("unexpected auth style {:?}", other),
        }
    }
}

#[test]
fn test_text_paths() {
    let openai = ProviderId::OpenAI.config();
    assert_eq!(
        openai.delta_text_path.unwrap().to_string(),
        "choices[0].delta.content"
    );
    assert_eq!(openai.final_text_path.to_string(), "choices[0].message.content");

    let gemini = ProviderId::Gemini.config();
    assert_eq!(
        gemini.delta_text_path.unwrap().to_string(),
        "candidates[0].content.parts[0].text"
    );
    assert_eq!(
        gemini.final_text_path.to_string(),
        "candidates[0].content.parts[0].text"
    );

    let anthropic = ProviderId::Anthropic.config();
    assert!(anthropic.delta_text_path.is_none());
    assert_eq!(anthropic.final_text_path.to_string(), "content[0].text");
}

#[test]
fn test_stream_terminators() {
    assert_eq!(ProviderId::OpenAI.config().stream_terminator, Some("[DONE]"));
    assert_eq!(ProviderId::DeepSeek.config().stream_terminator, Some("[DONE]"));
    assert_eq!(ProviderId::Grok.config().stream_terminator, Some("[DONE]"));
    assert_eq!(ProviderId::Gemini.config().stream_terminator, None);
}

#[test]
fn test_endpoint_templates() {
    let gemini = ProviderId::Gemini.config();
    assert_eq!(
        gemini.endpoint_template(false),
        "/models/{model}:generateContent"
    );
    assert_eq!(
        gemini.endpoint_template(true),
        "/models/{model}:streamGenerateContent?alt=sse"
    );

    let openai = ProviderId::OpenAI.config();
    assert_eq!(openai.endpoint_template(true), "/chat/completions");
    assert_eq!(ProviderId::Anthropic.config().endpoint_template(true), "/v1/messages");
}

#[test]
fn test_all_lists_each_provider_once() {
    let ids: Vec<_> = ProviderConfig::all().map(|c| c.id).collect();
    assert_eq!(ids, ProviderId::ALL.to_vec());
}

#[test]
fn test_display_round_trips_through_parse() {
    for id in ProviderId::ALL {
        assert_eq!(id.to_string().parse::<ProviderId>().unwrap(), id);
    }
}

#[test]
fn test_credentials_debug_redacts_key() {
    let creds = ProviderCredentials::new("sk-secret").with_base_url("http://localhost:1234");
    let debug = format!("{:?}", creds);
    assert!(!debug.contains("sk-secret"));
    assert!(debug.contains("localhost:1234"));
    assert_eq!(creds.api_key(), "sk-secret");
}

#[test]
fn test_credentials_base_url_default() {
    let creds = ProviderCredentials::new("k");
    assert_eq!(
        creds.base_url(ProviderId::DeepSeek.config()),
        "https://api.deepseek.com"
    );
}
