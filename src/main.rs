#[tokio::main(flavor = "current_thread")]
async fn main() {
    let code = mountpilot::run().await;
    std::process::exit(code);
}
