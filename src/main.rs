use hemmer_provider_vercel::{init_logging, serve, VercelProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    serve(VercelProvider::new()).await
}
