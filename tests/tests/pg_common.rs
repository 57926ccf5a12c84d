#![cfg(feature = "postgres")]

use anyhow::Result;
use testcontainers::ContainerAsync;
use testcontainers_modules::{postgres, testcontainers::runners::AsyncRunner};
use tokio_postgres::{Client, NoTls};

pub async fn create_postgres_container() -> Result<(ContainerAsync<postgres::Postgres>, Client)> {
    let container: ContainerAsync<postgres::Postgres> = postgres::Postgres::default()
        .with_db_name("hsfilter")
        .with_user("postgres")
        .with_password("postgres")
        // if you want to inspect the container
        // .with_container_name("hsfilter_pg")
        // .with_reuse(testcontainers::ReuseDirective::Always)
        .start()
        .await?;

    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let (client, connection) = tokio_postgres::connect(&format!("host={host} port={port} user=postgres password=postgres dbname=hsfilter"), NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("postgres connection error: {}", e);
        }
    });

    client
        .batch_execute(
            "CREATE TABLE haystack (
                customer_id    TEXT NOT NULL,
                start_datetime TIMESTAMPTZ NOT NULL,
                end_datetime   TIMESTAMPTZ NOT NULL,
                entity         JSONB NOT NULL
            )",
        )
        .await?;

    Ok((container, client))
}
