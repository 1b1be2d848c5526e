use chrono::Utc;
use futures_util::future::join_all;
use gnindex_schema::{Action, ColumnDef, FunctionSignature, IndexSpec, NormalizationFunction};
use gnindex_store::{MigrationId, Store, StoreError};

fn create_table(table: &str) -> Action {
    Action::CreateTable {
        table: table.to_owned(),
        columns: vec![
            ColumnDef::uuid("id").primary_key(),
            ColumnDef::string("name", 255).not_null(),
        ],
    }
}

pub async fn test_records(store: &Store) -> anyhow::Result<()> {
    store.mark_applied(MigrationId(20170916133024), Utc::now()).await?;
    store.mark_applied(MigrationId(20170815111416), Utc::now()).await?;

    assert!(store.is_applied(MigrationId(20170815111416)).await?);
    assert!(!store.is_applied(MigrationId(20171204101828)).await?);
    assert_eq!(
        store.list_applied().await?,
        vec![MigrationId(20170815111416), MigrationId(20170916133024)]
    );

    let err = store
        .mark_applied(MigrationId(20170916133024), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateRecord(MigrationId(20170916133024))));

    store.unmark(MigrationId(20170916133024)).await?;

    let err = store.unmark(MigrationId(20170916133024)).await.unwrap_err();
    assert!(matches!(err, StoreError::RecordNotFound(_)));

    let applied = store.applied().await?;
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].migration_id, MigrationId(20170815111416));

    Ok(())
}

pub async fn test_rollback(store: &Store, scope: &str) -> anyhow::Result<()> {
    let table = format!("{scope}_names");
    store.execute(&create_table(&table)).await?;

    let add_column = Action::AddColumn {
        table: table.to_owned(),
        column: ColumnDef::string("canonical", 255),
    };

    let mut tx = store.begin().await?;
    tx.execute(&add_column).await?;
    tx.mark_applied(MigrationId(1001), Utc::now()).await?;
    tx.rollback().await?;

    assert!(!store.is_applied(MigrationId(1001)).await?);

    // the column went away with the rollback, so adding it again succeeds
    store.execute(&add_column).await?;

    let err = store.execute(&add_column).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)), "{err}");

    Ok(())
}

pub async fn test_change_null(store: &Store, scope: &str) -> anyhow::Result<()> {
    let table = format!("{scope}_names");
    store.execute(&create_table(&table)).await?;

    let change = |column: &str, nullable: bool| Action::ChangeColumnNull {
        table: table.to_owned(),
        column: column.to_owned(),
        nullable,
    };

    let err = store.execute(&change("name", false)).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)), "{err}");

    store.execute(&change("name", true)).await?;

    let err = store.execute(&change("name", true)).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)), "{err}");

    store.execute(&change("name", false)).await?;

    let err = store.execute(&change("canonical", true)).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "{err}");

    Ok(())
}

pub async fn test_missing_objects(store: &Store, scope: &str) -> anyhow::Result<()> {
    let table = format!("{scope}_names");
    store.execute(&create_table(&table)).await?;

    let err = store
        .execute(&Action::DropIndex {
            name: format!("{scope}_missing_idx"),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "{err}");

    let err = store
        .execute(&Action::DropColumn {
            table: table.to_owned(),
            column: "canonical".to_owned(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "{err}");

    let index = Action::CreateIndex(IndexSpec::btree(&table, ["name"]));
    store.execute(&index).await?;

    let err = store.execute(&index).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)), "{err}");

    Ok(())
}

pub async fn test_function_references(store: &Store, scope: &str) -> anyhow::Result<()> {
    let table = format!("{scope}_names");
    let function = format!("{scope}_fold");
    store.execute(&create_table(&table)).await?;

    let create_function = Action::CreateFunction(NormalizationFunction::new(
        &function,
        "SELECT lower($1)",
    ));
    store.execute(&create_function).await?;

    let err = store.execute(&create_function).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)), "{err}");

    let index = IndexSpec::btree(&table, ["name"])
        .expression(format!("{function}(name)"))
        .operator_class("text_pattern_ops")
        .named(format!("{table}__name_fold"));
    store.execute(&Action::CreateIndex(index)).await?;

    let drop_function = Action::DropFunction(FunctionSignature::new(&function, ["text"]));
    let err = store.execute(&drop_function).await.unwrap_err();
    match err {
        StoreError::StillReferenced { function: name, indexes } => {
            assert_eq!(name, function);
            assert_eq!(indexes, vec![format!("{table}__name_fold")]);
        }
        err => anyhow::bail!("unexpected error {err}"),
    }

    store
        .execute(&Action::DropIndex {
            name: format!("{table}__name_fold"),
        })
        .await?;
    store.execute(&drop_function).await?;

    let err = store.execute(&drop_function).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "{err}");

    Ok(())
}

pub async fn test_concurrency(store: &Store) -> anyhow::Result<()> {
    let results = join_all(vec![
        store.mark_applied(MigrationId(3001), Utc::now()),
        store.mark_applied(MigrationId(3001), Utc::now()),
        store.mark_applied(MigrationId(3001), Utc::now()),
    ])
    .await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|err| matches!(err, StoreError::DuplicateRecord(MigrationId(3001)))));

    Ok(())
}
