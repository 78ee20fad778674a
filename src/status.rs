use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::history;
use crate::library;

pub async fn show_status(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let documents = library::count_documents(&pool).await?;
    let searches = history::list_history(&pool).await?.len();
    pool.close().await;

    let ann = &config.annotation;
    let key_status = if !ann.is_enabled() {
        "n/a"
    } else if ann.api_key_present() {
        "ready"
    } else {
        "missing"
    };

    println!("{:<16} {}", "database", config.db.path.display());
    println!("{:<16} {}", "documents", documents);
    println!("{:<16} {}", "recent searches", searches);
    println!("{:<16} {}", "provider", ann.provider);
    if ann.is_enabled() {
        println!("{:<16} {}", "model", ann.model);
        println!("{:<16} {}", "translate to", ann.target_language);
        println!("{:<16} {} ({})", "api key", key_status, ann.api_key_var());
    } else {
        println!("{:<16} {}", "api key", key_status);
    }

    Ok(())
}
