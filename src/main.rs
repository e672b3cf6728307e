use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rag_reader::{
    api::{dto::ListParams, proxy},
    config::Config,
    models::{citations::strip_citations, class_level::class_label},
    orchestrator::chat_session::{AssistantTarget, ChatSessionReconciler, ChatState},
    services::{completion_client::CompletionClient, rag_client::RagClient, resource_fetcher::ResourceFetcher},
};

#[derive(Parser)]
#[command(name = "rag-reader", version, about = "Document reader client for a RAG backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the same-origin PDF proxy
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// List datasets (books)
    Datasets {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
        #[arg(long)]
        name: Option<String>,
    },
    /// List documents in a dataset
    Documents { dataset_id: String },
    /// Ask the assistant for a book one question
    Ask { book: String, question: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_reader=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Command::Serve { port } => serve(&config, port).await,
        Command::Datasets {
            page,
            page_size,
            name,
        } => {
            let client = RagClient::new(&config)?;
            let params = ListParams {
                page,
                page_size,
                name,
                ..ListParams::default()
            };
            for dataset in client.list_datasets(&params).await? {
                println!(
                    "{}\t{}\t{}",
                    dataset.id,
                    dataset.name,
                    class_label(&dataset.name)
                );
            }
            Ok(())
        }
        Command::Documents { dataset_id } => {
            let client = RagClient::new(&config)?;
            let page = client
                .list_documents(&dataset_id, &ListParams::default())
                .await?;
            for doc in page.docs {
                println!("{}\t{}", doc.id, doc.name);
            }
            println!("total: {}", page.total);
            Ok(())
        }
        Command::Ask { book, question } => ask(&config, book, &question).await,
    }
}

async fn serve(config: &Config, port: Option<u16>) -> anyhow::Result<()> {
    let fetcher = ResourceFetcher::new(config)?;
    let app = proxy::create_router(proxy::ProxyState { fetcher });

    let addr = SocketAddr::from(([127, 0, 0, 1], port.unwrap_or(config.proxy_port)));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("PDF proxy listening on {}", addr);
    tracing::info!("Proxying documents from {}", config.api_base());

    axum::serve(listener, app).await?;
    Ok(())
}

async fn ask(config: &Config, book: String, question: &str) -> anyhow::Result<()> {
    let client = Arc::new(RagClient::new(config)?);
    let mut chat = ChatSessionReconciler::new(client, config.user_id.clone());
    if !config.completion_api_key.is_empty() {
        chat = chat.with_title_generator(Arc::new(CompletionClient::new(config)?));
    }

    if let ChatState::Unavailable = chat.open(AssistantTarget::BookName(book.clone())).await? {
        anyhow::bail!("No chat assistant is available for {}", book);
    }

    if let Some(reply) = chat.send(question).await? {
        println!("{}", strip_citations(&reply.content));
        for (i, chunk) in reply.references.iter().enumerate() {
            println!("[{}] {}", i, chunk.document_name.as_deref().unwrap_or(&chunk.id));
        }
    }
    Ok(())
}
