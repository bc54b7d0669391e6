//! `ros systems recommendations`

use anyhow::Result;
use ros_lib::{query::Pagination, PanelView, RecommendationsPanel, Store};
use tabled::{settings::Style, Table, Tabled};

use super::Session;
use crate::output::{page_footer, print_info, print_json, OutputFormat};

/// Row for recommendations table
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Rule")]
    rule_id: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Detected")]
    detected_on: String,
}

/// Mount the panel of `inventory_id` on the requested page
pub async fn load_recommendations(
    session: &Session,
    inventory_id: &str,
    page: u32,
    per_page: Option<u32>,
) -> Result<PanelView> {
    let pagination = Pagination::new(page, per_page.unwrap_or(session.default_per_page));
    let panel = RecommendationsPanel::new(
        inventory_id,
        session.api.clone(),
        session.users.clone(),
        Store::new(),
    )
    .with_pagination(pagination);

    panel.mount().await?;
    Ok(panel.view().await)
}

pub async fn show_recommendations(
    session: &Session,
    inventory_id: &str,
    page: u32,
    per_page: Option<u32>,
    format: OutputFormat,
) -> Result<()> {
    let view = load_recommendations(session, inventory_id, page, per_page).await?;

    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            let records = view.recommendations.as_deref().unwrap_or_default();
            if records.is_empty() {
                print_info(&format!("No recommendations for {}", inventory_id));
                return Ok(());
            }

            let rows: Vec<RecommendationRow> = records
                .iter()
                .map(|r| RecommendationRow {
                    rule_id: text(&r.rule_id),
                    description: text(&r.description),
                    reason: truncate(&text(&r.reason), 60),
                    detected_on: text(&r.detected_on),
                })
                .collect();

            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
            println!("\n{}", page_footer(&view.pagination, "recommendations"));
        }
    }

    Ok(())
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

/// Cut `s` to at most `max` characters
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
    }

    #[tokio::test]
    async fn test_load_second_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/ros/v1/systems/host-1/recommendations")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "5".into()),
                Matcher::UrlEncoded("offset".into(), "5".into()),
            ]))
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data": [{"rule_id": "cpu_undersized", "description": "CPU pressure"}],
                    "meta": {"count": 6}}"#,
            )
            .create_async()
            .await;

        let session =
            Session::connect(&server.url(), None, Some("secret".to_string()), "ops", 10).unwrap();
        let view = load_recommendations(&session, "host-1", 2, Some(5))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(view.pagination.page, 2);
        assert_eq!(view.pagination.total_pages(), 2);
        let records = view.recommendations.unwrap();
        assert_eq!(records[0].rule_id.as_deref(), Some("cpu_undersized"));
    }

    #[tokio::test]
    async fn test_blank_user_fetches_nothing() {
        let server = mockito::Server::new_async().await;
        let session = Session::connect(&server.url(), None, None, " ", 10).unwrap();

        let err = load_recommendations(&session, "host-1", 1, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no user configured"));
    }
}
