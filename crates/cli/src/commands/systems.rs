//! `ros systems list`

use anyhow::Result;
use ros_lib::{
    query::{SortDirection, HOSTNAME_OR_ID},
    Store, SystemListPage, SystemsView, TableConfig,
};
use tabled::{builder::Builder, settings::Style};
use tracing::debug;

use super::Session;
use crate::output::{page_footer, paint, print_json, print_warning, OutputFormat};

/// Arguments of `systems list`
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    pub page: u32,
    pub per_page: Option<u32>,
    pub sort: Option<String>,
    pub direction: Option<SortDirection>,
    pub name: Option<String>,
    pub no_inventory: bool,
}

/// Load one page of the systems table
pub async fn load_systems(session: &Session, args: &ListArgs) -> Result<SystemsView> {
    let page = SystemListPage::new(session.api.clone(), Store::new());
    let inventory = if args.no_inventory {
        None
    } else {
        session.inventory.clone()
    };
    page.on_load(inventory).await;

    let mut config = TableConfig::new(
        args.page,
        args.per_page.unwrap_or(session.default_per_page),
    );
    config.order_by = args.sort.clone();
    config.order_direction = args.direction;
    if let Some(name) = &args.name {
        config.filters.insert(HOSTNAME_OR_ID.to_string(), name.clone());
    }
    debug!(?config, "Loading systems");

    page.get_entities(&config).await?;
    Ok(page.view().await)
}

pub async fn list_systems(session: &Session, args: &ListArgs, format: OutputFormat) -> Result<()> {
    let view = load_systems(session, args).await?;

    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            if view.rows.is_empty() {
                print_warning("No systems found");
                return Ok(());
            }
            println!("{}", render_table(&view));
            println!("\n{}", page_footer(&view.pagination, "systems"));
        }
    }

    Ok(())
}

/// Systems table with one column per table column, in table order
fn render_table(view: &SystemsView) -> String {
    let mut builder = Builder::default();
    builder.push_record(view.columns.iter().map(|c| c.title().to_string()));
    for row in &view.rows {
        builder.push_record(row.cells.iter().map(paint));
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn systems_body() -> String {
        serde_json::json!({
            "data": [
                {
                    "inventory_id": "a",
                    "display_name": "web-01",
                    "display_performance_score": {"cpu_score": 40, "memory_score": 90, "io_score": 100},
                    "recommendation_count": 2,
                    "state": "Undersized"
                },
                {"inventory_id": "b", "recommendation_count": 0}
            ],
            "meta": {"count": 12, "limit": 10, "offset": 10}
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_load_systems_with_sort_and_filter() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/ros/v1/systems")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "10".into()),
                Matcher::UrlEncoded("offset".into(), "10".into()),
                Matcher::UrlEncoded("order_by".into(), "cpu_score".into()),
                Matcher::UrlEncoded("order_how".into(), "desc".into()),
                Matcher::UrlEncoded("display_name".into(), "web".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(systems_body())
            .create_async()
            .await;

        let session = Session::connect(&server.url(), None, None, "ops", 10).unwrap();
        let args = ListArgs {
            page: 2,
            sort: Some("cpu_score".to_string()),
            direction: Some(SortDirection::Desc),
            name: Some("web".to_string()),
            ..ListArgs::default()
        };
        let view = load_systems(&session, &args).await.unwrap();

        mock.assert_async().await;
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.pagination.page, 2);
        assert_eq!(view.pagination.total_pages(), 2);
    }

    #[tokio::test]
    async fn test_rendered_table_has_titles_and_cells() {
        colored::control::set_override(false);

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/ros/v1/systems")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(systems_body())
            .create_async()
            .await;

        let session = Session::connect(&server.url(), None, None, "ops", 10).unwrap();
        let args = ListArgs {
            page: 2,
            ..ListArgs::default()
        };
        let view = load_systems(&session, &args).await.unwrap();
        let table = render_table(&view);

        assert!(table.contains("Name"));
        assert!(table.contains("CPU score"));
        assert!(table.contains("web-01"));
        assert!(table.contains("Undersized"));
        assert!(table.contains(" 40%"));
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/ros/v1/systems")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let session = Session::connect(&server.url(), None, None, "ops", 10).unwrap();
        let args = ListArgs {
            page: 1,
            ..ListArgs::default()
        };
        let err = load_systems(&session, &args).await.unwrap_err();
        assert_eq!(err.to_string(), "Internal Server Error");
    }
}
