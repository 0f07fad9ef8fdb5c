use figment::Jail;
use pretty_assertions::assert_eq;

use wikirag_core::config::{Config, Settings};

fn load(env: &str) -> Result<Settings, figment::Error> {
    let config = Config::load_for_env(env).map_err(|e| figment::Error::from(e.to_string()))?;
    config.settings().map_err(|e| figment::Error::from(e.to_string()))
}

#[test]
fn defaults_apply_without_any_files() {
    Jail::expect_with(|_jail| {
        let settings = load("dev")?;
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.retrieval.top_n, 6);
        assert_eq!(settings.retrieval.search_limit, 10);
        assert!((settings.retrieval.blend_weight - 0.5).abs() < f32::EPSILON);
        assert_eq!(settings.llm.max_retries, 3);
        Ok(())
    });
}

#[test]
fn env_file_overrides_base_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
            [retrieval]
            top_n = 4
            [llm]
            default_model = "bielik"
            "#,
        )?;
        jail.create_file("config.prod.toml", "[retrieval]\ntop_n = 9\n")?;

        let dev = load("dev")?;
        assert_eq!(dev.retrieval.top_n, 4);
        assert_eq!(dev.llm.default_model, "bielik");

        let prod = load("prod")?;
        assert_eq!(prod.retrieval.top_n, 9);
        assert_eq!(prod.llm.default_model, "bielik");
        Ok(())
    });
}

#[test]
fn app_env_vars_win_over_files() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[retrieval]\nmax_concurrency = 2\n")?;
        jail.set_env("APP_RETRIEVAL__MAX_CONCURRENCY", "8");
        jail.set_env("APP_RETRIEVAL__NEIGHBOR_EXPANSION", "false");

        let settings = load("dev")?;
        assert_eq!(settings.retrieval.max_concurrency, 8);
        assert!(!settings.retrieval.neighbor_expansion);
        Ok(())
    });
}

#[test]
fn invalid_values_are_rejected_at_load() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[retrieval]\nblend_weight = 1.5\n")?;
        assert!(Config::load_for_env("dev").is_err());
        Ok(())
    });

    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[retrieval]\ntop_n = 0\n")?;
        let err = Config::load_for_env("test").err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("top_n"), "unexpected error: {err}");
        Ok(())
    });
}

#[test]
fn get_reads_single_keys() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[store]\ncollection = \"Artykuly\"\n")?;
        let config = Config::load_for_env("dev").map_err(|e| figment::Error::from(e.to_string()))?;
        let collection: String = config.get("store.collection").map_err(|e| figment::Error::from(e.to_string()))?;
        assert_eq!(collection, "Artykuly");
        assert!(config.get::<String>("store.missing").is_err());
        Ok(())
    });
}
