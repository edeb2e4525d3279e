use teloxide::utils::command::BotCommands;

use crate::forwarder::SettingCommand;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Copy a range of channel messages in batches. Commands:")]
pub enum Command {
    #[command(description = "set how many messages to copy between pauses.")]
    BatchSize(String),
    #[command(description = "set the pause between batches, in seconds.")]
    Delay(String),
    #[command(description = "set the channel to copy from.")]
    Source(String),
    #[command(description = "set the channel to copy to.")]
    Target(String),
    #[command(description = "set the first message ID to copy.")]
    Start(String),
    #[command(description = "set the last message ID to copy.")]
    End(String),
    #[command(description = "start copying.")]
    Forward,
    #[command(description = "stop the running copy.")]
    Stop,
    #[command(description = "show the current settings.")]
    Status,
    #[command(description = "show this text.")]
    Help,
}

impl Command {
    /// The settings change this command makes, if it is a settings command.
    pub fn setting(self) -> Option<SettingCommand> {
        match self {
            Self::BatchSize(args) => Some(SettingCommand::BatchSize(args)),
            Self::Delay(args) => Some(SettingCommand::Delay(args)),
            Self::Source(args) => Some(SettingCommand::Source(args)),
            Self::Target(args) => Some(SettingCommand::Target(args)),
            Self::Start(args) => Some(SettingCommand::Start(args)),
            Self::End(args) => Some(SettingCommand::End(args)),
            Self::Forward | Self::Stop | Self::Status | Self::Help => None,
        }
    }
}
