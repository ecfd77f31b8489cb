//! 커미션 관리 터미널 클라이언트
//!
//! 서버 JSON API를 사용해 목록/요약 조회, 등록, 편집, 지급 상태 전환,
//! 삭제, CSV 내보내기를 수행한다.

mod api;
mod view;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::{error, info};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::api::{edit_snapshot, toggle_body, ApiClient, CommissionForm};
use crate::view::{preview_commission, render_summary, render_table, format_brl, Filter, Summary};

#[derive(Debug, Parser)]
#[command(name = "comissao-client", about = "Controle de comissões")]
struct Cli {
    /// 서버 주소
    #[arg(long, env = "COMISSAO_URL", default_value = "http://localhost:3001")]
    url: String,

    #[arg(long, env = "COMISSAO_USER", default_value = "admin")]
    username: String,

    #[arg(long, env = "COMISSAO_PASSWORD", default_value = "admin123", hide_env_values = true)]
    password: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 목록과 요약 출력
    List {
        #[arg(long, value_enum, default_value_t = Filter::All)]
        filter: Filter,
    },
    /// 요약만 출력
    Summary,
    /// 커미션 등록
    Add {
        #[arg(long)]
        value_nf: Decimal,
        #[arg(long, default_value = "0.025")]
        factor: Decimal,
        #[arg(long)]
        nf: Option<String>,
        #[arg(long)]
        nectar: Option<String>,
        #[arg(long)]
        embrascol: Option<String>,
    },
    /// 행 편집 (편집된 스냅샷 전체를 보낸다)
    Edit {
        id: i64,
        #[arg(long)]
        nf: Option<String>,
        #[arg(long)]
        nectar: Option<String>,
        #[arg(long)]
        embrascol: Option<String>,
        #[arg(long)]
        value_nf: Option<Decimal>,
        #[arg(long)]
        factor: Option<Decimal>,
    },
    /// 지급/미지급 전환
    Toggle { id: i64 },
    /// 삭제
    Delete {
        id: i64,
        /// 확인 없이 삭제
        #[arg(long)]
        yes: bool,
    },
    /// CSV 내보내기
    Export {
        #[arg(long, default_value = "comissoes.csv")]
        output: PathBuf,
    },
}

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [s/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "s" | "sim" | "y" | "yes"))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = ApiClient::new(&cli.url)?;
    let user = client
        .login(&cli.username, &cli.password)
        .await
        .context("login falhou")?;
    info!("로그인: {}", user.username);

    match cli.command {
        Command::List { filter } => {
            let commissions = client.list().await?;
            print!("{}", render_table(&filter.apply(&commissions)));
            println!();
            println!("{}", render_summary(&Summary::from_commissions(&commissions)));
        }
        Command::Summary => {
            let commissions = client.list().await?;
            println!("{}", render_summary(&Summary::from_commissions(&commissions)));
        }
        Command::Add {
            value_nf,
            factor,
            nf,
            nectar,
            embrascol,
        } => {
            match preview_commission(value_nf, factor) {
                Some(preview) => println!("Prévia da comissão: {}", format_brl(preview)),
                None => println!("Prévia da comissão: indisponível"),
            }

            let form = CommissionForm {
                nf_number: nf,
                order_number_nectar: nectar,
                order_number_embrascol: embrascol,
                value_nf,
                factor: Some(factor),
            };
            let created = client.create(&form).await?;
            print!("{}", render_table(&[&created]));
        }
        Command::Edit {
            id,
            nf,
            nectar,
            embrascol,
            value_nf,
            factor,
        } => {
            let commissions = client.list().await?;
            let Some(current) = commissions.iter().find(|c| c.id == id) else {
                bail!("comissão {} não encontrada", id);
            };

            let mut snapshot = edit_snapshot(current);
            if let Some(nf) = nf {
                snapshot.insert("nf_number".into(), Value::String(nf));
            }
            if let Some(nectar) = nectar {
                snapshot.insert("order_number_nectar".into(), Value::String(nectar));
            }
            if let Some(embrascol) = embrascol {
                snapshot.insert("order_number_embrascol".into(), Value::String(embrascol));
            }
            if let Some(value_nf) = value_nf {
                snapshot.insert("value_nf".into(), Value::String(value_nf.to_string()));
            }
            if let Some(factor) = factor {
                snapshot.insert("factor".into(), Value::String(factor.to_string()));
            }

            let updated = client.update(id, &Value::Object(snapshot)).await?;
            print!("{}", render_table(&[&updated]));
        }
        Command::Toggle { id } => {
            let commissions = client.list().await?;
            let Some(current) = commissions.iter().find(|c| c.id == id) else {
                bail!("comissão {} não encontrada", id);
            };

            let updated = client.update(id, &toggle_body(current)).await?;
            print!("{}", render_table(&[&updated]));
        }
        Command::Delete { id, yes } => {
            if !yes && !confirm("Tem certeza que deseja excluir esta comissão?")? {
                println!("Cancelado.");
                return Ok(());
            }
            client.delete(id).await?;
            println!("Comissão {} excluída.", id);
        }
        Command::Export { output } => {
            let csv = client.export().await?;
            std::fs::write(&output, &csv)
                .with_context(|| format!("falha ao gravar {}", output.display()))?;
            println!("Arquivo exportado: {}", output.display());
        }
    }

    if let Err(e) = client.logout().await {
        error!("로그아웃 실패: {}", e);
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // 로깅 초기화
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Erro: {:#}", e);
        std::process::exit(1);
    }
}
