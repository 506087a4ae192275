//! Configuration layering: defaults, then the TOML file, then
//! `LEXCRAWL_`-prefixed environment variables.

use std::env;

use tempfile::TempDir;

use lexcrawl::Settings;

#[test]
fn file_overrides_defaults_and_env_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("lexcrawl.toml");
    std::fs::write(
        &config_path,
        r#"
[crawler]
max_pages = 250

[chunking]
chunk_size = 800

[embedding]
provider = "local"
"#,
    )
    .unwrap();

    unsafe {
        env::set_var("LEXCRAWL_CRAWLER__MAX_PAGES", "50");
        env::set_var("LEXCRAWL_INDEX__USE_EMBEDDINGS", "false");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    unsafe {
        env::remove_var("LEXCRAWL_CRAWLER__MAX_PAGES");
        env::remove_var("LEXCRAWL_INDEX__USE_EMBEDDINGS");
    }

    // env beats file
    assert_eq!(settings.crawler.max_pages, 50);
    // file beats defaults
    assert_eq!(settings.chunking.chunk_size, 800);
    assert_eq!(
        settings.embedding.provider,
        lexcrawl::config::EmbeddingProvider::Local
    );
    // env beats defaults
    assert!(!settings.index.use_embeddings);
    // untouched values keep their defaults
    assert_eq!(settings.crawler.max_depth, 2);
    assert_eq!(settings.pdf.max_pages, 500);
}

#[test]
fn invalid_chunking_fails_the_load() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("lexcrawl.toml");
    std::fs::write(
        &config_path,
        r#"
[chunking]
chunk_size = 100
chunk_overlap = 150
"#,
    )
    .unwrap();

    assert!(Settings::load_from(&config_path).is_err());
}
