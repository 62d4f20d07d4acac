#[tokio::main]
async fn main() -> std::process::ExitCode {
    doc_qa_lib::run().await
}
