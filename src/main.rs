use chefchat::agents::cook::CookAgent;
use chefchat::agents::finder::FoodFinderAgent;
use chefchat::agents::{Agent, AgentDispatcher};
use chefchat::api::{ChatApi, ChatClient};
use chefchat::cli::Args;
use chefchat::config::Config;
use chefchat::tools::{AmapClient, RecipeStore};
use chefchat::ui::{ChatUi, TerminalUi};
use clap::Parser;
use colored::*;
use std::io::{self, BufRead, Write};
use std::process;
use std::sync::Arc;
use tokio::sync::Mutex;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match Config::from_env_and_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            process::exit(1);
        }
    };

    let client: Arc<dyn ChatApi> = Arc::new(ChatClient::new(
        &config.api_key,
        &config.api_endpoint,
        &config.model,
        config.stream_timeout,
        config.verbose,
    )?);

    let store = RecipeStore::load(
        config.recipes_path.as_deref(),
        config.custom_recipes_path.clone(),
        config.verbose,
    );
    if config.verbose {
        eprintln!(
            "{}",
            format!("[AI] Recipe library: {} dishes", store.len()).dimmed()
        );
    }
    let store = Arc::new(Mutex::new(store));
    let amap = Arc::new(AmapClient::new(config.amap_key.clone(), config.verbose));
    let ui: Arc<dyn ChatUi> = Arc::new(TerminalUi::new());

    let agents: Vec<Box<dyn Agent>> = vec![
        Box::new(CookAgent::new(store, config.verbose)),
        Box::new(FoodFinderAgent::new(amap, config.verbose)),
    ];

    let mut dispatcher = AgentDispatcher::new(
        agents,
        client,
        ui,
        config.suggestions_enabled,
        config.verbose,
    );

    // One-shot mode: a message on the command line is a single turn.
    if !args.message.is_empty() {
        dispatcher.dispatch(&args.message.join(" ")).await;
        return Ok(());
    }

    println!("{}", "chefchat - 今天吃什么？".cyan().bold());
    println!(
        "{}",
        "输入消息开始聊天，/reset 重置对话，/quit 退出".dimmed()
    );

    let stdin = io::stdin();
    loop {
        print!("{} ", "你:".green().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();

        match message {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                dispatcher.reset_all_agents();
                println!("{}", "已重置所有对话".dimmed());
                continue;
            }
            _ => {}
        }

        // One turn at a time: input is not read again until the
        // in-flight dispatch settles.
        dispatcher.dispatch(message).await;
    }

    Ok(())
}
