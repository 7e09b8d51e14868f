//! CLI 모듈
//!
//! pdf-qa CLI 명령어 정의 및 구현

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chat::{ChatSession, ConversationTurn};
use crate::config::{
    QaConfig, DEFAULT_DOCUMENT_PATH, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TEMPERATURE,
};
use crate::document::load_document;
use crate::embedding::{OpenAiEmbedding, DEFAULT_EMBEDDING_MODEL};
use crate::error::QaError;
use crate::generation::{OpenAiChat, DEFAULT_CHAT_MODEL};
use crate::knowledge::{ChunkConfig, Chunker, DistanceMetric, FixedWindowChunker, SearchResult};
use crate::openai::{get_api_key, has_api_key, OpenAiClient, RetryPolicy, API_KEY_ENV, DEFAULT_API_BASE};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "pdf-qa")]
#[command(version, about = "PDF 문서 기반 대화형 QA 챗봇", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub options: SessionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 대화형 QA 세션 시작
    Chat,

    /// 질문 하나에 답변하고 종료
    Ask {
        /// 질문
        question: String,

        /// 근거 세그먼트도 출력
        #[arg(long)]
        show_sources: bool,
    },

    /// 문서 검색만 수행 (답변 생성 없음)
    Search {
        /// 검색 쿼리
        query: String,

        /// 결과 개수
        #[arg(short = 'k', long, default_value = "4")]
        limit: usize,
    },

    /// 상태 확인 (네트워크 호출 없음)
    Status,
}

/// 세션 설정 옵션 (모든 명령어 공통)
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// 질의 대상 문서 (PDF 또는 텍스트)
    #[arg(long, global = true, env = "PDF_QA_DOCUMENT", default_value = DEFAULT_DOCUMENT_PATH)]
    pub document: PathBuf,

    /// 세그먼트 크기 (문자 수)
    #[arg(long, global = true, env = "PDF_QA_CHUNK_SIZE", default_value = "1000")]
    pub chunk_size: usize,

    /// 세그먼트 오버랩 (문자 수)
    #[arg(long, global = true, env = "PDF_QA_CHUNK_OVERLAP", default_value = "200")]
    pub chunk_overlap: usize,

    /// 질문 당 검색 세그먼트 수
    #[arg(long, global = true, env = "PDF_QA_TOP_K", default_value = "4")]
    pub top_k: usize,

    /// 유사도 방식 (l2, cosine, ip)
    #[arg(long, global = true, env = "PDF_QA_METRIC", default_value = "l2", value_parser = parse_metric)]
    pub metric: DistanceMetric,

    /// 생성 온도
    #[arg(long, global = true, env = "PDF_QA_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// 채팅 모델
    #[arg(long, global = true, env = "OPENAI_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    /// 임베딩 모델
    #[arg(long, global = true, env = "OPENAI_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// OpenAI 호환 API 기본 URL
    #[arg(long, global = true, env = "OPENAI_BASE_URL", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// 질문 하나의 처리 기한 (초, 0이면 무제한)
    #[arg(long, global = true, env = "PDF_QA_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub timeout: u64,

    /// 서비스 호출 최대 재시도 횟수
    #[arg(long, global = true, env = "PDF_QA_MAX_RETRIES", default_value = "3")]
    pub max_retries: u32,

    /// 답변 최대 토큰 (미지정 시 서비스 기본값)
    #[arg(long, global = true, env = "PDF_QA_MAX_TOKENS")]
    pub max_tokens: Option<u32>,
}

fn parse_metric(s: &str) -> std::result::Result<DistanceMetric, String> {
    DistanceMetric::parse(s).ok_or_else(|| format!("unknown metric '{}' (use l2, cosine, ip)", s))
}

impl SessionArgs {
    /// 옵션을 세션 설정으로 변환 (검증 포함)
    pub fn to_config(&self) -> crate::error::Result<QaConfig> {
        let config = QaConfig {
            document_path: self.document.clone(),
            chunk: ChunkConfig::new(self.chunk_size, self.chunk_overlap)?,
            top_k: self.top_k,
            metric: self.metric,
            temperature: self.temperature,
            chat_model: self.chat_model.clone(),
            embedding_model: self.embedding_model.clone(),
            api_base: self.api_base.clone(),
            request_timeout: (self.timeout > 0).then(|| Duration::from_secs(self.timeout)),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                ..RetryPolicy::default()
            },
            max_tokens: self.max_tokens,
            ..QaConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Chat => cmd_chat(&cli.options).await,
        Commands::Ask {
            question,
            show_sources,
        } => cmd_ask(&cli.options, &question, show_sources).await,
        Commands::Search { query, limit } => cmd_search(&cli.options, &query, limit).await,
        Commands::Status => cmd_status(&cli.options).await,
    }
}

/// OpenAI 프로바이더로 세션 구성
fn build_session(options: &SessionArgs) -> Result<ChatSession> {
    let config = options.to_config()?;
    let api_key = get_api_key()?;

    let client = OpenAiClient::new(
        api_key,
        &config.api_base,
        config.http_timeout,
        config.retry.clone(),
    )
    .context("OpenAI 클라이언트 생성 실패")?;

    let embedder = Arc::new(OpenAiEmbedding::new(
        client.clone(),
        config.embedding_model.clone(),
    ));
    let mut chat = OpenAiChat::new(client, config.chat_model.clone());
    if let Some(max_tokens) = config.max_tokens {
        chat = chat.with_max_tokens(max_tokens);
    }
    let generator = Arc::new(chat);

    Ok(ChatSession::create(config, embedder, generator)?)
}

/// 지식베이스 초기화 (진행 메시지 출력)
async fn initialize(session: &ChatSession) -> crate::error::Result<()> {
    println!(
        "[*] 문서 로드 및 인덱스 생성 중: {}",
        session.config().document_path.display()
    );

    let stats = session.initialize().await?;
    println!(
        "[OK] 준비 완료: {} 페이지, {} 세그먼트",
        stats.page_count, stats.segment_count
    );
    Ok(())
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 대화 명령어 (chat)
///
/// 한 줄에 질문 하나를 입력받아 답변하고, 매 턴마다 전체 대화 기록을 출력합니다.
/// `/reload`로 문서를 다시 읽어 인덱스를 재구축하고, `/quit` 또는 EOF로 종료합니다.
async fn cmd_chat(options: &SessionArgs) -> Result<()> {
    let mut session = build_session(options)?;

    if let Err(e) = initialize(&session).await {
        println!("[!] 시스템 초기화 실패: {}", e);
        println!("    문제를 해결한 뒤 /reload 로 다시 시도하세요.");
    }

    println!("질문을 입력하세요. (/reload: 다시 초기화, /quit: 종료)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await.context("입력 읽기 실패")? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reload" => {
                session.reset();
                if let Err(e) = initialize(&session).await {
                    println!("[!] 시스템 초기화 실패: {}", e);
                }
            }
            question => match session.ask(question).await {
                Ok(_) => {
                    println!();
                    print!("{}", render_history(&session.history().await));
                }
                Err(QaError::NotInitialized) => {
                    println!("[!] 시스템이 초기화되지 않았습니다. /reload 로 다시 시도하세요.");
                }
                Err(e) => {
                    println!("[!] 질문 처리 중 오류: {}", e);
                }
            },
        }
    }

    let history = session.destroy();
    println!("[OK] 세션 종료 ({} 턴)", history.len());

    Ok(())
}

/// 단일 질문 명령어 (ask)
async fn cmd_ask(options: &SessionArgs, question: &str, show_sources: bool) -> Result<()> {
    let session = build_session(options)?;
    initialize(&session).await.context("시스템 초기화 실패")?;

    let answer = session.ask(question).await.context("질문 처리 실패")?;

    println!();
    println!("{}", answer.text);

    if show_sources {
        println!();
        println!("[*] 근거 세그먼트 ({} 건):", answer.sources.len());
        print_results(&answer.sources);
    }

    Ok(())
}

/// 검색 명령어 (search)
async fn cmd_search(options: &SessionArgs, query: &str, limit: usize) -> Result<()> {
    let session = build_session(options)?;
    initialize(&session).await.context("시스템 초기화 실패")?;

    println!("[*] 검색 중: \"{}\"", query);
    let results = session.search(query, limit).await.context("검색 실패")?;

    if results.is_empty() {
        println!("\n[!] 검색 결과가 없습니다.");
        return Ok(());
    }

    println!("\n[OK] 검색 결과 ({} 건):\n", results.len());
    print_results(&results);

    Ok(())
}

/// 상태 명령어 (status)
///
/// 설정, API 키, 문서 분할 결과를 확인합니다. 임베딩 서비스는 호출하지 않습니다.
async fn cmd_status(options: &SessionArgs) -> Result<()> {
    println!("pdf-qa v{}", env!("CARGO_PKG_VERSION"));
    println!();

    if has_api_key() {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정");
        println!("    설정: export {}=your-key (또는 .env 파일)", API_KEY_ENV);
    }

    let config = match options.to_config() {
        Ok(config) => config,
        Err(e) => bail!("설정 오류: {}", e),
    };

    println!(
        "[*] 모델: {} / {} (temperature {})",
        config.chat_model, config.embedding_model, config.temperature
    );
    println!(
        "[*] 청킹: {} / {} 문자, top-k {}, {:?}",
        config.chunk.chunk_size, config.chunk.chunk_overlap, config.top_k, config.metric
    );

    let path = &config.document_path;
    match std::fs::metadata(path) {
        Ok(meta) => println!(
            "[OK] 문서: {} ({})",
            path.display(),
            format_bytes(meta.len() as usize)
        ),
        Err(_) => {
            println!("[!] 문서를 찾을 수 없습니다: {}", path.display());
            return Ok(());
        }
    }

    match load_document(path).await {
        Ok(document) => {
            let chunker = FixedWindowChunker::new(config.chunk)?;
            let segments = chunker.split(&document);
            println!(
                "[OK] {} 페이지, {} 문자 → {} 세그먼트",
                document.pages.len(),
                document.total_chars(),
                segments.len()
            );
        }
        Err(e) => println!("[!] 문서 로드 실패: {}", e),
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 대화 기록 렌더링 (오래된 순)
fn render_history(turns: &[ConversationTurn]) -> String {
    let mut out = String::new();
    for turn in turns {
        out.push_str(&format!("[사용자] {}\n", turn.question));
        out.push_str(&format!("[답변] {}\n\n", turn.answer));
    }
    out
}

/// 검색 결과 출력
fn print_results(results: &[SearchResult]) {
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [점수: {:.4}] Page {} (세그먼트 #{})",
            i + 1,
            result.similarity,
            result.segment.source_page,
            result.segment.index
        );
        println!("   내용: {}", truncate_text(&result.segment.text, 200));
        println!();
    }
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================
