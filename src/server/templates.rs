use askama::Template;

/// Landing page.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub title: &'a str,
    pub download_path: &'a str,
    pub filename: &'a str,
    pub json_path: &'a str,
    pub listing_url: &'a str,
}
