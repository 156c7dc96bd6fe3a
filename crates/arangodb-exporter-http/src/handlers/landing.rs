use axum::response::{Html, IntoResponse};

const LANDING_PAGE: &str = "<html>
<head><title>ArangoDB Exporter</title></head>
<body>
<h1>ArangoDB Exporter</h1>
<p><a href='/metrics'>Metrics</a></p>
</body>
</html>
";

pub async fn landing_page() -> impl IntoResponse {
    Html(LANDING_PAGE)
}
