use std::sync::Arc;

use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};
use tracing::error;

use crate::application::gateway::PostsGateway;
use crate::application::scope::RequestScope;
use crate::domain::posts::Post;
use crate::presentation::views::{
    ComposeFormView, HomePageContext, PostCardView, SessionGateView,
};

const CLOCK_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

const DEFAULT_COMPOSE_CONTENT: &str = "I published this straight from the front page.";

/// Assembles the front page: the post feed plus the session-gated creation
/// form. Listing failures are deliberately absorbed here so the page always
/// renders; an unreachable backend shows as an empty feed, never as an
/// error page.
#[derive(Clone)]
pub struct HomeService {
    posts: Arc<dyn PostsGateway>,
}

impl HomeService {
    pub fn new(posts: Arc<dyn PostsGateway>) -> Self {
        Self { posts }
    }

    pub async fn front_page(&self, scope: &RequestScope) -> HomePageContext {
        let posts = match self.posts.list_posts(scope).await {
            Ok(posts) => posts,
            Err(err) => {
                error!(
                    target = "portico::home",
                    request_id = scope.request_id,
                    error = %err,
                    "listing posts failed; rendering an empty feed"
                );
                Vec::new()
            }
        };

        let cards: Vec<PostCardView> = posts.into_iter().map(post_to_card).collect();

        HomePageContext {
            post_count: cards.len(),
            posts: cards,
            gate: SessionGateView::from(&scope.session),
            compose: compose_defaults(OffsetDateTime::now_utc()),
        }
    }
}

fn post_to_card(post: Post) -> PostCardView {
    let href = format!("/posts/{}", post.id);
    PostCardView {
        id: post.id.to_string(),
        title: post.title,
        content: post.content,
        href,
    }
}

fn compose_defaults(now: OffsetDateTime) -> ComposeFormView {
    let clock = now.format(CLOCK_FORMAT).expect("valid clock format");
    ComposeFormView {
        default_title: format!("Today, {clock} UTC"),
        default_content: DEFAULT_COMPOSE_CONTENT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use time::macros::datetime;

    use super::*;
    use crate::application::gateway::GatewayError;
    use crate::domain::posts::{PostDraft, PostId};
    use crate::domain::session::{SessionState, UserSession};

    struct StaticPosts {
        posts: Vec<Post>,
        fail_listing: bool,
    }

    #[async_trait]
    impl PostsGateway for StaticPosts {
        async fn list_posts(&self, _scope: &RequestScope) -> Result<Vec<Post>, GatewayError> {
            if self.fail_listing {
                return Err(GatewayError::Transport("connection refused".to_string()));
            }
            Ok(self.posts.clone())
        }

        async fn create_post(
            &self,
            _scope: &RequestScope,
            _draft: PostDraft,
        ) -> Result<PostId, GatewayError> {
            Ok(PostId::new("unused"))
        }
    }

    fn post(id: &str, title: &str) -> Post {
        Post {
            id: PostId::new(id),
            title: title.to_string(),
            content: format!("{title} body"),
        }
    }

    fn anonymous_scope() -> RequestScope {
        RequestScope::new("req-1".to_string(), SessionState::SignedOut)
    }

    #[tokio::test]
    async fn front_page_preserves_backend_order() {
        let service = HomeService::new(Arc::new(StaticPosts {
            posts: vec![post("a", "First"), post("b", "Second"), post("c", "Third")],
            fail_listing: false,
        }));

        let page = service.front_page(&anonymous_scope()).await;

        assert_eq!(page.post_count, 3);
        let ids: Vec<&str> = page.posts.iter().map(|card| card.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(page.posts[0].href, "/posts/a");
    }

    #[tokio::test]
    async fn front_page_absorbs_listing_failures() {
        let service = HomeService::new(Arc::new(StaticPosts {
            posts: vec![post("a", "First")],
            fail_listing: true,
        }));

        let page = service.front_page(&anonymous_scope()).await;

        assert_eq!(page.post_count, 0);
        assert!(page.posts.is_empty());
        assert!(matches!(page.gate, SessionGateView::SignedOut));
    }

    #[tokio::test]
    async fn front_page_gates_on_the_scope_session() {
        let service = HomeService::new(Arc::new(StaticPosts {
            posts: Vec::new(),
            fail_listing: false,
        }));
        let scope = RequestScope::new(
            "req-2".to_string(),
            SessionState::SignedIn(UserSession {
                username: "ada".to_string(),
                access_token: "token".to_string(),
            }),
        );

        let page = service.front_page(&scope).await;

        match page.gate {
            SessionGateView::SignedIn(user) => assert_eq!(user.username, "ada"),
            SessionGateView::SignedOut => panic!("expected the signed-in gate"),
        }
    }

    #[test]
    fn compose_defaults_stamp_the_current_clock() {
        let form = compose_defaults(datetime!(2025-07-04 09:05:02 UTC));
        assert_eq!(form.default_title, "Today, 09:05:02 UTC");
        assert_eq!(form.default_content, DEFAULT_COMPOSE_CONTENT);
    }
}
