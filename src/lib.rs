// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # commandry
//!
//! A platform-agnostic command framework.
//!
//! Given a textual command line entered by some sender, `commandry` routes
//! the input through a tree of registered commands, parses typed arguments,
//! validates permissions and sender types, invokes a user-supplied handler,
//! and reports failures through a structured exception pipeline. It also
//! produces completion suggestions for partially typed input.
//!
//! `commandry` does not implement transport, persistence, or thread
//! spawning. A platform adapter (a chat bot, a game server, a console)
//! supplies a sender type, a permission function, and an executor, and
//! converts native input into calls to [`manager::CommandManager`].

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod caption;
pub mod command;
pub mod context;
pub mod exception;
pub mod execution;
pub mod input;
pub mod manager;
pub mod meta;
pub mod parser;
pub mod permission;
pub mod settings;
pub mod suggestion;
pub mod tree;
pub mod util;

/// Convenience re-exports of the types most consumers need.
pub mod prelude {
    pub use crate::caption::{Caption, CaptionKey, CaptionRegistry, DefaultCaptionRegistry};
    pub use crate::command::{Command, CommandBuildError, CommandBuilder, CommandHandler, ExecutableCommand};
    pub use crate::context::{CommandContext, FlagContext, ParsingContext};
    pub use crate::exception::{
        CommandExecutionError, ExceptionContext, ExceptionController, HandlerOutcome,
        InvalidSenderError, InvalidSyntaxError, NoPermissionError, NoSuchCommandError,
    };
    pub use crate::execution::{CommandExecutor, CommandOutcome, CommandResult, ExecutorCoordinator};
    pub use crate::input::CommandInput;
    pub use crate::manager::CommandManager;
    pub use crate::meta::{MetaKey, MetaMap};
    pub use crate::parser::flag::{FlagDescriptor, FlagParseError, FlagSet};
    pub use crate::parser::standard::{
        BooleanParser, DoubleParser, EnumParser, FloatParser, IntegerParser, LiteralParser,
        LongParser, Range, StringArrayParser, StringParser,
    };
    pub use crate::parser::{ArgumentParseError, ArgumentParser, ParseResult, ParserRegistry};
    pub use crate::permission::{Permission, PermissionResult};
    pub use crate::settings::CommandManagerSettings;
    pub use crate::suggestion::{Message, Suggestion};
    pub use crate::tree::{CommandComponent, CommandNode, ComponentKind, DefaultValue};
}
