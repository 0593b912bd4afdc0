use reqwest::Method;
use serde::Serialize;

use super::client::{ApiClient, ApiError};
use super::types::{Category, CategoryId};

/// Request body for creating a child category under an existing parent.
///
/// `level` is supplied by the caller as `parent.level + 1`; the store rejects
/// anything else. The slug is always server-minted and never sent.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewCategory {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    pub parent_id: CategoryId,
    pub level: u32,
}

/// Request body for splicing a category between a parent and one of its
/// children. The store reparents `children_id` under the new node and
/// relevels that whole subtree by +1.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InsertCategory {
    #[serde(flatten)]
    pub category: NewCategory,
    pub children_id: CategoryId,
}

impl ApiClient {
    /// `GET /category/level/1`: the root frontier.
    pub async fn fetch_roots(&self) -> Result<Vec<Category>, ApiError> {
        self.request_json(Method::GET, &["category", "level", "1"], None::<&()>, true)
            .await
    }

    /// `GET /category/children-of-parent/{id}`: children of one node.
    pub async fn fetch_children(&self, parent: &CategoryId) -> Result<Vec<Category>, ApiError> {
        self.request_json(
            Method::GET,
            &["category", "children-of-parent", parent.as_str()],
            None::<&()>,
            true,
        )
        .await
    }

    /// Fetches the frontier for `parent`: its children, or the root set when
    /// `parent` is absent.
    pub async fn fetch_frontier(
        &self,
        parent: Option<&CategoryId>,
    ) -> Result<Vec<Category>, ApiError> {
        match parent {
            Some(parent) => self.fetch_children(parent).await,
            None => self.fetch_roots().await,
        }
    }

    /// `POST /category/create`. Returns the created row with its
    /// server-computed fields.
    pub async fn create_category(&self, body: &NewCategory) -> Result<Category, ApiError> {
        self.request_json(Method::POST, &["category", "create"], Some(body), false)
            .await
    }

    /// `POST /category/insert`. Returns the created row; the reparented
    /// subtree is only observable through subsequent fetches.
    pub async fn insert_category(&self, body: &InsertCategory) -> Result<Category, ApiError> {
        self.request_json(Method::POST, &["category", "insert"], Some(body), false)
            .await
    }

    /// `DELETE /category/{id}`. Descendant handling is store policy.
    pub async fn delete_category(&self, id: &CategoryId) -> Result<(), ApiError> {
        self.request_empty(Method::DELETE, &["category", id.as_str()], None::<&()>)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), None, Duration::from_secs(5)).unwrap()
    }

    fn row(id: &str, name: &str, parent: Option<&str>, level: u32) -> serde_json::Value {
        let mut v = json!({
            "_id": id,
            "name": name,
            "slug": name.to_lowercase(),
            "level": level,
        });
        if let Some(p) = parent {
            v["parent_id"] = json!(p);
        }
        v
    }

    #[tokio::test]
    async fn fetch_roots_hits_level_one() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/category/level/1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([row("1", "Apparel", None, 1)])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let roots = client(&server).await.fetch_roots().await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, CategoryId::from("1"));
        assert_eq!(roots[0].level, 1);
    }

    #[tokio::test]
    async fn fetch_children_path_carries_parent_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/category/children-of-parent/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([row("5", "Shoes", Some("1"), 2)])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let children = client(&server)
            .await
            .fetch_children(&CategoryId::from("1"))
            .await
            .unwrap();
        assert_eq!(children[0].parent_id, Some(CategoryId::from("1")));
    }

    #[tokio::test]
    async fn create_sends_exact_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/category/create"))
            .and(body_json(json!({
                "name": "Shoes",
                "parent_id": "1",
                "level": 2,
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(row("9", "Shoes", Some("1"), 2)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let created = client(&server)
            .await
            .create_category(&NewCategory {
                name: "Shoes".to_owned(),
                description: None,
                image_uri: None,
                parent_id: CategoryId::from("1"),
                level: 2,
            })
            .await
            .unwrap();
        assert_eq!(created.slug, "shoes");
    }

    #[tokio::test]
    async fn insert_body_flattens_and_adds_children_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/category/insert"))
            .and(body_json(json!({
                "name": "Sneakers",
                "description": "Mid layer",
                "parent_id": "1",
                "level": 2,
                "children_id": "5",
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(row("10", "Sneakers", Some("1"), 2)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let created = client(&server)
            .await
            .insert_category(&InsertCategory {
                category: NewCategory {
                    name: "Sneakers".to_owned(),
                    description: Some("Mid layer".to_owned()),
                    image_uri: None,
                    parent_id: CategoryId::from("1"),
                    level: 2,
                },
                children_id: CategoryId::from("5"),
            })
            .await
            .unwrap();
        assert_eq!(created.id, CategoryId::from("10"));
    }

    #[tokio::test]
    async fn delete_uses_id_path_and_tolerates_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/category/5"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .await
            .delete_category(&CategoryId::from("5"))
            .await
            .unwrap();
    }
}
