//! Shell command - interactive storefront session
//!
//! Holds one `StorefrontContext` for the whole session so cookies and the
//! session state survive between commands.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use storefront_core::services::{resolve, ResendCooldown};
use storefront_core::{AuthProbe, Navigation, NewProduct, Route, SessionPhase, SignupForm, StorefrontContext};

use super::get_context;
use crate::output::{self, ConsoleNotifier};

const HELP: &[(&str, &str)] = &[
    ("signup", "Create an account"),
    ("verify <code>", "Submit the emailed verification code"),
    ("resend", "Send a new verification code"),
    ("login", "Log in"),
    ("logout", "Log out"),
    ("whoami", "Show the current session"),
    ("products [all|featured|<category>]", "List products"),
    ("create", "Create a product (admin)"),
    ("delete <id>", "Delete a product (admin)"),
    ("feature <id>", "Toggle a product's featured flag (admin)"),
    ("open <path>", "Show where navigating to a page would lead"),
    ("help", "Show this help"),
    ("quit", "Leave the shell"),
];

struct Shell {
    ctx: StorefrontContext,
    cooldown: Option<ResendCooldown>,
}

pub async fn run() -> Result<()> {
    let ctx = get_context(Arc::new(ConsoleNotifier))?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message("Checking session...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    let probe = ctx.session.check_auth().await;
    spinner.finish_and_clear();

    match (probe, ctx.session.snapshot().user) {
        (AuthProbe::Authenticated, Some(user)) => {
            output::info(&format!("Welcome back, {}", user.name));
        }
        _ => output::info("Not logged in. Type 'help' for commands."),
    }

    let mut shell = Shell { ctx, cooldown: None };
    loop {
        let line: String = Input::new()
            .with_prompt(shell.prompt())
            .allow_empty(true)
            .interact_text()?;

        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        match command {
            "quit" | "exit" => break,
            "help" => print_help(),
            "signup" => shell.signup().await?,
            "verify" => shell.verify(args.first().copied()).await?,
            "resend" => shell.resend().await,
            "login" => shell.login().await?,
            "logout" => {
                let _ = shell.ctx.session.logout().await;
            }
            "whoami" => output::print_session(&shell.ctx.session.snapshot()),
            "products" => shell.products(args.first().copied()).await,
            "create" => shell.create().await?,
            "delete" => shell.delete(args.first().copied()).await?,
            "feature" => shell.feature(args.first().copied()).await,
            "open" => shell.open(args.first().copied()),
            other => output::warning(&format!("Unknown command '{}'. Type 'help' for commands.", other)),
        }
    }

    Ok(())
}

fn print_help() {
    let mut table = output::create_table();
    table.set_header(vec!["Command", "Description"]);
    for (command, description) in HELP {
        table.add_row(vec![*command, *description]);
    }
    println!("{}", table);
}

impl Shell {
    fn prompt(&self) -> String {
        let session = self.ctx.session.snapshot();
        match (session.phase(), &session.user, &session.pending_email) {
            (SessionPhase::Authenticated, Some(user), _) => format!("storefront ({})", user.email),
            (SessionPhase::PendingVerification, _, Some(email)) => {
                format!("storefront (verifying {})", email)
            }
            _ => "storefront".to_string(),
        }
    }

    /// Store actions report their own failures through the notifier, so the
    /// shell only reacts to success.
    async fn signup(&mut self) -> Result<()> {
        let name: String = Input::new().with_prompt("Name").interact_text()?;
        let email: String = Input::new().with_prompt("Email").interact_text()?;
        let password = Password::new().with_prompt("Password").interact()?;
        let confirm = Password::new().with_prompt("Confirm password").interact()?;

        let form = SignupForm::new(name, email, password, confirm);
        if self.ctx.session.signup(&form).await.is_ok() {
            self.cooldown = Some(ResendCooldown::default());
            output::info("Enter the code with: verify <code>");
        }
        Ok(())
    }

    async fn verify(&mut self, code: Option<&str>) -> Result<()> {
        let code = match code {
            Some(code) => code.to_string(),
            None => Input::new().with_prompt("Verification code").interact_text()?,
        };

        if self.ctx.session.verify_otp(&code).await.is_ok() {
            self.cooldown = None;
        }
        Ok(())
    }

    async fn resend(&mut self) {
        if let Some(cooldown) = &self.cooldown {
            if !cooldown.can_resend() {
                output::warning(&format!(
                    "You can request a new code in {}s",
                    cooldown.remaining().as_secs().max(1)
                ));
                return;
            }
        }

        if self.ctx.session.resend_otp().await.is_ok() {
            match &mut self.cooldown {
                Some(cooldown) => cooldown.restart(),
                None => self.cooldown = Some(ResendCooldown::default()),
            }
        }
    }

    async fn login(&mut self) -> Result<()> {
        let email: String = Input::new().with_prompt("Email").interact_text()?;
        let password = Password::new().with_prompt("Password").interact()?;

        let _ = self.ctx.session.login(&email, &password).await;
        Ok(())
    }

    async fn products(&self, filter: Option<&str>) {
        let fetched = match filter {
            None | Some("all") => self.ctx.catalog.fetch_all().await,
            Some("featured") => self.ctx.catalog.fetch_featured().await,
            Some(category) => self.ctx.catalog.fetch_by_category(category).await,
        };
        if fetched.is_ok() {
            output::print_products(&self.ctx.catalog.products());
        }
    }

    fn require_admin(&self) -> bool {
        let is_admin = self.ctx.session.snapshot().is_admin();
        if !is_admin {
            output::warning("Only admins can manage products");
        }
        is_admin
    }

    async fn create(&self) -> Result<()> {
        if !self.require_admin() {
            return Ok(());
        }

        let name: String = Input::new().with_prompt("Name").interact_text()?;
        let description: String = Input::new()
            .with_prompt("Description")
            .allow_empty(true)
            .interact_text()?;
        let price: String = Input::new()
            .with_prompt("Price")
            .validate_with(|input: &String| -> std::result::Result<(), String> {
                match Decimal::from_str(input.trim()) {
                    Ok(price) if price.is_sign_negative() => Err("Price cannot be negative".to_string()),
                    Ok(_) => Ok(()),
                    Err(_) => Err("Enter a number, e.g. 19.99".to_string()),
                }
            })
            .interact_text()?;
        let category: String = Input::new().with_prompt("Category").interact_text()?;
        let image: String = Input::new().with_prompt("Image URL").interact_text()?;

        let price = Decimal::from_str(price.trim())?;
        let mut product = NewProduct::new(name, price, category, image);
        if !description.trim().is_empty() {
            product = product.with_description(description);
        }

        if let Ok(created) = self.ctx.catalog.create(&product).await {
            output::info(&format!("New product id: {}", created.id));
        }
        Ok(())
    }

    async fn delete(&self, id: Option<&str>) -> Result<()> {
        let Some(id) = id else {
            output::warning("Usage: delete <id>");
            return Ok(());
        };
        if !self.require_admin() {
            return Ok(());
        }

        let confirmed = Confirm::new()
            .with_prompt(format!("Delete product {}?", id))
            .default(false)
            .interact()?;
        if confirmed {
            let _ = self.ctx.catalog.delete(id).await;
        }
        Ok(())
    }

    async fn feature(&self, id: Option<&str>) {
        let Some(id) = id else {
            output::warning("Usage: feature <id>");
            return;
        };
        if !self.require_admin() {
            return;
        }

        if let Ok(featured) = self.ctx.catalog.toggle_featured(id).await {
            let state = if featured { "featured" } else { "not featured" };
            output::info(&format!("Product {} is now {}", id, state));
        }
    }

    fn open(&self, path: Option<&str>) {
        let Some(route) = Route::parse(path.unwrap_or("/")) else {
            output::warning("Unknown page");
            return;
        };

        match resolve(&route, &self.ctx.session.snapshot()) {
            Navigation::Render => println!("{} {}", "render".green(), route),
            Navigation::Redirect(target) => println!("{} {} -> {}", "redirect".yellow(), route, target),
            Navigation::Wait => println!("{} {}", "waiting".cyan(), route),
        }
    }
}
