pub mod calculate;
pub mod normalize;
pub mod project;
pub mod serve;

/// Runtime for the commands that talk HTTP.
fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn std::error::Error>> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}
