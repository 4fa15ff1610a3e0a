use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use validator::Validate;

use lotostats_backend::{
    client::{ApiClient, ClientError, DEFAULT_API_BASE},
    display::{render_catalog, render_result},
    errors::field_messages,
    models::{
        find_game, ConfirmPaymentQuery, ForgotPasswordRequest, GenerationRequest, LoginRequest,
        RegisterRequest, LOTTERY_GAMES,
    },
    session::{FileStore, Onboarding, Screen, SessionUser},
};

#[derive(Parser)]
#[command(name = "lotostats")]
#[command(about = "LotoStats AI - sugestões de números para as loterias da Caixa")]
#[command(version)]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "LOTOSTATS_API", default_value = DEFAULT_API_BASE, global = true)]
    api: String,

    /// Session file (default: ~/.lotostats/session.json)
    #[arg(long, env = "LOTOSTATS_SESSION", global = true)]
    session_file: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current screen and session
    Status,
    /// Leave the landing page for the login screen
    Start,
    /// Create an account and log in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Log in with an existing account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Request a password reset
    Forgot {
        #[arg(long)]
        email: String,
    },
    /// Start a checkout, or confirm one with the ids from the payment redirect
    Pay {
        /// Confirm without a real payment (server must allow it)
        #[arg(long)]
        simulate: bool,
        #[arg(long)]
        payment_id: Option<String>,
        #[arg(long)]
        preference_id: Option<String>,
        #[arg(long)]
        merchant_order_id: Option<String>,
    },
    /// List the available games
    Games,
    /// Ask for a suggestion
    Generate {
        /// Game id or name (e.g. mega-sena)
        #[arg(short, long)]
        game: String,
        /// Amount of numbers; defaults to the game's minimum
        #[arg(short, long)]
        picks: Option<u32>,
    },
    /// Go back one screen
    Back,
    /// Clear the session
    Logout,
}

fn default_session_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lotostats")
        .join("session.json")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log_level))
        .with_writer(std::io::stderr)
        .init();

    let session_file = cli.session_file.clone().unwrap_or_else(default_session_file);
    let mut flow = Onboarding::load(FileStore::open(session_file));
    let api = ApiClient::new(&cli.api)?;

    match cli.command {
        Commands::Status => {
            print_status(&flow);
            check_token(&api, &flow).await;
        }
        Commands::Start => {
            flow.start()?;
            println!("Acesse sua conta: `lotostats login` ou `lotostats register`.");
        }
        Commands::Register { email, password, name } => {
            let request = RegisterRequest { email, password, name };
            check(&request)?;
            ensure_on_auth(&mut flow)?;
            let response = api.register(&request).await.map_err(explain)?;
            let user = SessionUser {
                email: response.user.email,
                name: response.user.name,
            };
            let screen = flow.login(user, Some(response.token), response.user.paid)?;
            announce(screen);
        }
        Commands::Login { email, password } => {
            let request = LoginRequest { email, password };
            check(&request)?;
            ensure_on_auth(&mut flow)?;
            let response = api.login(&request).await.map_err(explain)?;
            let user = SessionUser {
                email: response.user.email,
                name: response.user.name,
            };
            let screen = flow.login(user, Some(response.token), response.user.paid)?;
            announce(screen);
        }
        Commands::Forgot { email } => {
            let request = ForgotPasswordRequest { email };
            check(&request)?;
            api.forgot_password(&request).await.map_err(explain)?;
            println!("Se o e-mail estiver cadastrado, você receberá as instruções.");
        }
        Commands::Pay {
            simulate,
            payment_id,
            preference_id,
            merchant_order_id,
        } => {
            if flow.navigate(Screen::Payment)? != Screen::Payment {
                bail!("Faça login antes de pagar (`lotostats login`).");
            }
            let session = flow.session().clone();
            let email = session
                .user
                .as_ref()
                .map(|u| u.email.clone())
                .ok_or_else(|| anyhow!("Sessão sem usuário"))?;

            let confirmation = if simulate {
                let token = session
                    .token
                    .as_deref()
                    .ok_or_else(|| anyhow!("Sessão sem token; faça login novamente."))?;
                Some(api.simulate_payment(token).await.map_err(explain)?)
            } else if payment_id.is_some() || preference_id.is_some() || merchant_order_id.is_some() {
                let query = ConfirmPaymentQuery {
                    payment_id,
                    preference_id,
                    merchant_order_id,
                    external_reference: Some(email.clone()),
                    ..Default::default()
                };
                Some(api.confirm_payment(&query).await.map_err(explain)?)
            } else {
                match api.create_preference(&email).await {
                    Ok(preference) => {
                        println!("Acesso Vitalício - R$ 9,90");
                        println!("Pague em: {}", preference.init_point);
                        println!(
                            "Depois confirme com: lotostats pay --preference-id {}",
                            preference.preference_id
                        );
                    }
                    Err(e) => {
                        warn!("Checkout could not be started: {}", e);
                        println!("Erro ao iniciar checkout: {}", e);
                        println!("Para testes locais: lotostats pay --simulate");
                    }
                }
                None
            };

            if let Some(confirmation) = confirmation {
                if confirmation.success {
                    let screen = flow.payment_confirmed(confirmation.token)?;
                    println!("Pagamento confirmado! Acesso liberado.");
                    announce(screen);
                } else {
                    let detail = confirmation
                        .status
                        .or(confirmation.message)
                        .unwrap_or_else(|| "pendente".to_string());
                    println!(
                        "Pagamento ainda não confirmado ({}). Tente novamente em alguns segundos.",
                        detail
                    );
                }
            }
        }
        Commands::Games => print!("{}", render_catalog(LOTTERY_GAMES)),
        Commands::Generate { game, picks } => {
            if flow.navigate(Screen::App)? != Screen::App {
                bail!("Faça login e conclua o pagamento para usar o gerador.");
            }
            let game = find_game(&game).ok_or_else(|| anyhow!("Jogo desconhecido: {}", game))?;

            let requested = picks.unwrap_or(game.min_picks);
            let pick_count = game.clamp_pick_count(requested);
            if pick_count != requested {
                if game.is_fixed {
                    println!(
                        "A {} possui uma quantidade fixa de {} números/palpites.",
                        game.name, pick_count
                    );
                } else {
                    println!(
                        "Quantidade ajustada para {} (min {}, max {}).",
                        pick_count, game.min_picks, game.max_picks
                    );
                }
            }

            let request = GenerationRequest {
                game_name: game.name.to_string(),
                pick_count,
            };
            check(&request)?;
            let token = flow
                .session()
                .token
                .clone()
                .context("Sessão sem token; faça login novamente.")?;

            println!("Analisando dados...");
            let result = api.generate(&token, &request).await.map_err(explain)?;
            print!("{}", render_result(game, &result));
        }
        Commands::Back => announce(flow.back()?),
        Commands::Logout => {
            flow.logout()?;
            println!("Sessão encerrada.");
        }
    }

    Ok(())
}

fn ensure_on_auth(flow: &mut Onboarding<FileStore>) -> anyhow::Result<()> {
    match flow.screen() {
        Screen::Auth => Ok(()),
        Screen::Landing => {
            flow.start()?;
            Ok(())
        }
        other => bail!("Você já está na tela '{}'. Use `lotostats logout` para trocar de conta.", other),
    }
}

/// Client-side field validation, before anything is sent.
fn check<T: Validate>(request: &T) -> anyhow::Result<()> {
    if let Err(errors) = request.validate() {
        for (field, messages) in field_messages(&errors) {
            for message in messages {
                eprintln!("{}: {}", field, message);
            }
        }
        bail!("Dados inválidos");
    }
    Ok(())
}

fn explain(error: ClientError) -> anyhow::Error {
    if let ClientError::Api { fields, .. } = &error {
        for (field, messages) in fields {
            for message in messages {
                eprintln!("{}: {}", field, message);
            }
        }
    }
    anyhow!(error)
}

fn announce(screen: Screen) {
    let hint = match screen {
        Screen::Landing => "Use `lotostats start` para começar.",
        Screen::Auth => "Entre com `lotostats login` ou crie uma conta com `lotostats register`.",
        Screen::Payment => "Conclua o pagamento com `lotostats pay`.",
        Screen::App => "Gere números com `lotostats generate --game mega-sena`.",
    };
    println!("Tela atual: {}. {}", screen, hint);
}

/// Asks the server whether the stored token still identifies the user.
async fn check_token(api: &ApiClient, flow: &Onboarding<FileStore>) {
    let Some(token) = flow.session().token.as_deref() else {
        return;
    };
    match api.me(token).await {
        Ok(user) => {
            println!("Servidor: sessão válida para {}", user.email);
            if user.paid && !flow.session().paid {
                println!("Pagamento registrado no servidor; confirme com `lotostats pay`.");
            }
        }
        Err(ClientError::Api { status: 401, .. }) => {
            println!("Servidor: sessão expirada. Use `lotostats logout` e entre novamente.");
        }
        Err(e) => warn!("Could not check the session with the server: {}", e),
    }
}

fn print_status(flow: &Onboarding<FileStore>) {
    let session = flow.session();
    match &session.user {
        Some(user) => println!(
            "Usuário: {}{}",
            user.email,
            user.name
                .as_deref()
                .map(|n| format!(" ({})", n))
                .unwrap_or_default()
        ),
        None => println!("Usuário: (não autenticado)"),
    }
    println!("Pago: {}", if session.paid { "sim" } else { "não" });
    announce(flow.screen());
}
