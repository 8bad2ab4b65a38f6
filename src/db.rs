// connexion BD + création du schéma depuis les entités

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};

use crate::config::DatabaseConfig;
use crate::models::{accounts, complaints, pending_registrations};

pub async fn establish_connection(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .sqlx_logging(false);

    Database::connect(options).await
}

fn indexes() -> Vec<IndexCreateStatement> {
    vec![
        // unicité par collection : le même email peut exister en user et en engineer
        Index::create()
            .name("idx_accounts_role_email")
            .table(accounts::Entity)
            .col(accounts::Column::Role)
            .col(accounts::Column::Email)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_accounts_role_phone")
            .table(accounts::Entity)
            .col(accounts::Column::Role)
            .col(accounts::Column::Phone)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_complaints_user_email")
            .table(complaints::Entity)
            .col(complaints::Column::UserEmail)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_pending_registrations_email_role")
            .table(pending_registrations::Entity)
            .col(pending_registrations::Column::Email)
            .col(pending_registrations::Column::Role)
            .if_not_exists()
            .to_owned(),
    ]
}

/// Crée les tables et index manquants (idempotent)
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let tables = [
        schema.create_table_from_entity(accounts::Entity),
        schema.create_table_from_entity(complaints::Entity),
        schema.create_table_from_entity(pending_registrations::Entity),
    ];
    for mut table in tables {
        table.if_not_exists();
        db.execute(backend.build(&table)).await?;
    }

    for index in indexes() {
        db.execute(backend.build(&index)).await?;
    }

    tracing::info!("database schema ready");
    Ok(())
}
