//! Slash commands
//!
//! Handlers are looked up by command name, guild-scoped registrations first.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use discord_core::{ApplicationCommand, CommandDataOption, Interaction, Snowflake};
use discord_http::{Http, HttpResult, InteractionResponse};

use crate::Context;

type CommandHandler =
    Arc<dyn Fn(CommandContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// One slash command invocation
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub ctx: Context,
    pub interaction: Interaction,
}

impl CommandContext {
    /// Invoked command name
    pub fn name(&self) -> &str {
        self.interaction.command_name().unwrap_or_default()
    }

    /// Top-level option by name
    pub fn option(&self, name: &str) -> Option<&CommandDataOption> {
        self.interaction.data.as_ref()?.option(name)
    }

    /// Answer with a message visible to everyone
    pub async fn respond(&self, content: impl Into<String>) -> HttpResult<()> {
        self.callback(&InteractionResponse::message(content)).await
    }

    /// Answer with a message only the invoker sees
    pub async fn respond_ephemeral(&self, content: impl Into<String>) -> HttpResult<()> {
        self.callback(&InteractionResponse::ephemeral(content)).await
    }

    /// Acknowledge now and answer later
    pub async fn defer(&self) -> HttpResult<()> {
        self.callback(&InteractionResponse::deferred()).await
    }

    async fn callback(&self, response: &InteractionResponse) -> HttpResult<()> {
        self.ctx
            .http()
            .create_interaction_response(self.interaction.id, &self.interaction.token, response)
            .await
    }
}

struct RegisteredCommand {
    definition: ApplicationCommand,
    handler: CommandHandler,
}

/// Command definitions and their handlers
#[derive(Default)]
pub struct CommandRegistry {
    global: HashMap<String, RegisteredCommand>,
    guild: HashMap<(Snowflake, String), RegisteredCommand>,
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command, globally when `guild_id` is `None`
    ///
    /// A second registration with the same name and scope replaces the first.
    pub fn register<F, Fut>(
        &mut self,
        guild_id: Option<Snowflake>,
        definition: ApplicationCommand,
        handler: F,
    ) where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler: CommandHandler = Arc::new(move |ctx| Box::pin(handler(ctx)));
        let name = definition.name.clone();
        let command = RegisteredCommand {
            definition,
            handler,
        };

        let replaced = match guild_id {
            Some(guild_id) => self.guild.insert((guild_id, name.clone()), command),
            None => self.global.insert(name.clone(), command),
        };
        if replaced.is_some() {
            tracing::warn!(command = %name, guild_id = ?guild_id, "Replacing command handler");
        }
    }

    pub fn len(&self) -> usize {
        self.global.len() + self.guild.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.guild.is_empty()
    }

    /// Check if an invocation of `name` from `guild_id` has a handler
    pub fn contains(&self, guild_id: Option<Snowflake>, name: &str) -> bool {
        self.resolve(guild_id, name).is_some()
    }

    /// Global definitions, sorted by name
    pub fn global_definitions(&self) -> Vec<ApplicationCommand> {
        let mut definitions: Vec<_> = self
            .global
            .values()
            .map(|command| command.definition.clone())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Guild definitions grouped by guild, each sorted by name
    pub fn guild_definitions(&self) -> BTreeMap<Snowflake, Vec<ApplicationCommand>> {
        let mut grouped: BTreeMap<Snowflake, Vec<ApplicationCommand>> = BTreeMap::new();
        for ((guild_id, _), command) in &self.guild {
            grouped
                .entry(*guild_id)
                .or_default()
                .push(command.definition.clone());
        }
        for definitions in grouped.values_mut() {
            definitions.sort_by(|a, b| a.name.cmp(&b.name));
        }
        grouped
    }

    fn resolve(&self, guild_id: Option<Snowflake>, name: &str) -> Option<&RegisteredCommand> {
        guild_id
            .and_then(|guild_id| self.guild.get(&(guild_id, name.to_string())))
            .or_else(|| self.global.get(name))
    }

    /// Run the handler for an INTERACTION_CREATE, if it is a known command
    pub(crate) async fn handle_interaction(
        &self,
        ctx: Context,
        interaction: &Interaction,
    ) -> anyhow::Result<()> {
        let Some(name) = interaction.command_name() else {
            return Ok(());
        };
        let Some(command) = self.resolve(interaction.guild_id, name) else {
            tracing::debug!(command = %name, "No handler for command");
            return Ok(());
        };

        tracing::debug!(command = %name, interaction_id = %interaction.id, "Running command");
        (command.handler)(CommandContext {
            ctx,
            interaction: interaction.clone(),
        })
        .await
    }

    /// Overwrite the application's commands with the registered definitions
    ///
    /// Only scopes with at least one registered command are touched.
    pub(crate) async fn sync(&self, http: &Http, application_id: Snowflake) -> HttpResult<()> {
        if !self.global.is_empty() {
            let definitions = self.global_definitions();
            http.bulk_overwrite_global_commands(application_id, &definitions)
                .await?;
            tracing::info!(count = definitions.len(), "Registered global commands");
        }

        for (guild_id, definitions) in self.guild_definitions() {
            http.bulk_overwrite_guild_commands(application_id, guild_id, &definitions)
                .await?;
            tracing::info!(
                guild_id = %guild_id,
                count = definitions.len(),
                "Registered guild commands"
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("global", &self.global.keys().collect::<Vec<_>>())
            .field("guild", &self.guild.keys().collect::<Vec<_>>())
            .finish()
    }
}
