use git_otto::config::{
    CommitMode, Config, PROJECT_CONFIG_FILENAME, ProjectConfig, ProviderApi, ProviderConfig,
    PushProvider,
};
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

fn personal_config() -> Config {
    let mut config = Config::default();
    config.ai.enabled = true;
    config.ai.model = "claude-sonnet-4".to_string();
    config.ai.default_provider = "anthropic".to_string();
    config.ai.providers.insert(
        "anthropic".to_string(),
        ProviderConfig {
            api: ProviderApi::AnthropicMessages,
            base_url: "https://api.anthropic.com/v1".to_string(),
            api_key: Some("sk-personal".to_string()),
            api_key_env: None,
            headers: HashMap::new(),
        },
    );
    config.push.enabled = true;
    config
}

fn project(source: &str) -> ProjectConfig {
    toml::from_str(source).expect("project config should parse")
}

#[test]
fn minimal_project_file_leaves_personal_switches_alone() {
    let mut config = personal_config();
    config.merge_with_project_config(project(r#"exclude = ["*.lock"]"#));

    assert!(config.enabled);
    assert!(config.ai.enabled, "project file without [ai] must not disable AI");
    assert!(config.push.enabled, "project file without [push] must not disable push");
    assert_eq!(config.exclude, vec!["*.lock".to_string()]);
    assert_eq!(config.ai.model, "claude-sonnet-4");
}

#[test]
fn explicit_project_booleans_do_override() {
    let mut config = personal_config();
    config.merge_with_project_config(project(
        r#"
        enabled = false

        [ai]
        enabled = false

        [push]
        enabled = false
        "#,
    ));

    assert!(!config.enabled);
    assert!(!config.ai.enabled);
    assert!(!config.push.enabled);
}

#[test]
fn project_settings_take_precedence() {
    let mut config = personal_config();
    config.merge_with_project_config(project(
        r#"
        mode = "per-file"
        fallback_prefix = "feat"
        max_message_length = 50

        [ai]
        model = "anthropic/claude-haiku-4"

        [push]
        remote = "upstream"
        provider = "gitlab"
        "#,
    ));

    assert_eq!(config.mode, CommitMode::PerFile);
    assert_eq!(config.fallback_prefix, "feat");
    assert_eq!(config.max_message_length, 50);
    assert_eq!(config.ai.model, "anthropic/claude-haiku-4");
    assert_eq!(config.push.remote, "upstream");
    assert_eq!(config.push.provider, PushProvider::Gitlab);
}

#[test]
fn project_files_never_contribute_api_keys() {
    let mut config = personal_config();
    config.merge_with_project_config(project(
        r#"
        [ai.providers.anthropic]
        api = "anthropic-messages"
        base_url = "https://proxy.internal/v1"
        api_key = "sk-smuggled"
        api_key_env = "TEAM_ANTHROPIC_KEY"
        "#,
    ));

    let provider = &config.ai.providers["anthropic"];
    assert_eq!(provider.base_url, "https://proxy.internal/v1");
    assert_eq!(provider.api_key.as_deref(), Some("sk-personal"));
    assert_eq!(provider.api_key_env.as_deref(), Some("TEAM_ANTHROPIC_KEY"));
}

#[test]
fn project_file_can_introduce_a_provider() {
    let mut config = personal_config();
    config.merge_with_project_config(project(
        r#"
        [ai]
        model = "zai/glm-4.6"

        [ai.providers.zai]
        api = "openai-completions"
        base_url = "https://api.z.ai/v1"
        api_key_env = "ZAI_API_KEY"
        "#,
    ));

    let provider = &config.ai.providers["zai"];
    assert_eq!(provider.api, ProviderApi::OpenaiCompletions);
    assert_eq!(provider.api_key_env.as_deref(), Some("ZAI_API_KEY"));
    assert!(provider.api_key.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn load_project_config_reads_the_repo_root_file() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join(PROJECT_CONFIG_FILENAME),
        "mode = \"per-file\"\n",
    )
    .expect("write project config");

    let project = Config::load_project_config(dir.path()).expect("load");
    assert_eq!(project.mode, Some(CommitMode::PerFile));
    assert!(project.enabled.is_none());
}

#[test]
fn load_project_config_errors_are_descriptive() {
    let dir = TempDir::new().expect("tempdir");
    assert!(Config::load_project_config(dir.path()).is_err());

    fs::write(dir.path().join(PROJECT_CONFIG_FILENAME), "mode = [broken")
        .expect("write project config");
    let err = Config::load_project_config(dir.path()).expect_err("invalid toml");
    assert!(err.to_string().contains(PROJECT_CONFIG_FILENAME));
}
