//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire config, logging, storage and blob gateway the way a host would.
//! - Run one board + item document lifecycle and print each step.

use classboard_core::db::{open_db, open_db_in_memory};
use classboard_core::{
    init_logging, Board, BlobGateway, CoreConfig, Entity, EntityService, ItemRepository,
    LocalObjectStore, Projection, Repository, SqliteDocumentStore,
};
use log::{info, warn};
use serde_json::json;
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("classboard: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }
    if config.uses_dev_signing_secret() {
        warn!("event=config module=cli status=warn reason=dev_signing_secret");
    }

    println!("classboard_core ping={}", classboard_core::ping());
    println!("classboard_core version={}", classboard_core::core_version());

    let conn = match &config.db_path {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let store = SqliteDocumentStore::new(&conn);

    let boards = EntityService::new(Repository::<Board, _>::from_config(store, &config));
    let board = boards.create(&Board::new("Math"))?;
    println!("created {}", json!(board.project(Projection::Public)?));

    let mut changes = classboard_core::AttributeMap::new();
    changes.insert("title".to_string(), json!("Algebra"));
    let board = boards.update_fields(&board.id, changes)?;
    println!("updated {}", json!(board.project(Projection::Public)?));

    let object_store = LocalObjectStore::new(
        &config.documents.root,
        &config.documents.public_base_url,
        config.documents.signing_secret.as_bytes(),
    );
    let gateway = BlobGateway::from_config(&object_store, &config)?;
    let items = ItemRepository::new(Repository::from_config(store, &config), &gateway);

    let (item, grant) = items.create_with_upload(&board.id, 10.0, 20.0, "notes.txt", "text/plain")?;
    object_store.accept_upload(&grant.upload_url, "text/plain", b"smoke document")?;
    println!("item {} document={}", item.id, item.document);

    let deletion = items.delete_with_document(&item.id)?;
    println!("item deleted cleanup={:?}", deletion.cleanup);

    boards.delete(&board.id)?;
    match boards.delete(&board.id) {
        Err(err) => println!("second delete: {err}"),
        Ok(()) => return Err("second delete unexpectedly succeeded".into()),
    }

    info!("event=smoke_run module=cli status=ok");
    Ok(())
}
