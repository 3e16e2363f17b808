use serde::Deserialize;
use sqlx::FromRow;

#[derive(Clone, FromRow)]
pub struct Link {
    pub name: String,
    pub url: String,
    #[sqlx(default)]
    pub username: String,
}

/// Form body of the edit pages. The posted `name` field is display-only and
/// deliberately absent here: the upsert key always comes from the URL path.
#[derive(Deserialize)]
pub struct LinkForm {
    pub url: String,
}
