use tracing::debug;

use super::AgentContext;
use crate::integrations::web::search_url;
use crate::prompts::Prompt;
use crate::Result;

/// Answer from a search-engine results page. Fetch failures propagate.
pub async fn answer(ctx: &AgentContext, query: &str) -> Result<String> {
    let url = search_url(&ctx.settings.search_endpoint, query);
    let page = ctx.fetcher.fetch(&url).await?;
    debug!(%url, chars = page.chars().count(), "Search page fetched");

    let prompt = Prompt::Search.render(&[("query_result", page.as_str()), ("query", query)]);
    ctx.generator.generate(&prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testing::*;
    use crate::Error;
    use std::sync::Arc;

    #[tokio::test]
    async fn fetches_endpoint_with_plus_separated_query() {
        let generator = ScriptedGenerator::new(&["陈华编程是一个编程教育品牌"]);
        let fetcher = Arc::new(FakeFetcher {
            body: "陈华编程 官网 课程".to_string(),
            ..FakeFetcher::default()
        });
        let ctx = context(
            generator.clone(),
            Arc::new(FixedDocuments(Vec::new())),
            Arc::new(FakeGraph::default()),
            fetcher.clone(),
        );

        let text = answer(&ctx, "陈华编程 是什么").await.unwrap();

        assert_eq!(text, "陈华编程是一个编程教育品牌");
        assert_eq!(
            fetcher.urls.lock().unwrap().clone(),
            vec!["https://www.so.com/s?q=陈华编程+是什么".to_string()]
        );
        assert!(generator.prompts()[0].contains("检索结果：陈华编程 官网 课程"));
    }

    #[tokio::test]
    async fn fetch_failure_propagates_without_generation() {
        let generator = ScriptedGenerator::new(&[]);
        let ctx = context(
            generator.clone(),
            Arc::new(FixedDocuments(Vec::new())),
            Arc::new(FakeGraph::default()),
            Arc::new(FakeFetcher {
                fail: true,
                ..FakeFetcher::default()
            }),
        );

        let err = answer(&ctx, "刀郎最新的专辑").await.unwrap_err();

        assert!(matches!(err, Error::FetchError(_)));
        assert!(generator.prompts().is_empty());
    }
}
