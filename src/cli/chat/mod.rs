pub mod prompt;
pub mod render;

use std::io::Write;
use std::process::ExitCode;

use color_print::cformat;
use crossterm::cursor::MoveToColumn;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use crossterm::QueueableCommand;
use eyre::Result;
use prompt::generate_prompt;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use crate::chatbot_client::ConversationClient;
use crate::conversation_state::Role;

pub const DEFAULT_TITLE: &str = "AI Assistant";

const GREETING: &str = "Hello! I'm your AI assistant. How can I help you today?";

const THINKING_TEXT: &str = "AI is thinking...";

const HELP_TEXT: &str = "
/clear        Clear the conversation history
/history      Show the conversation so far
/help         Show this help dialogue
/quit         Quit the application
";

pub struct ChatContext {
    output: Box<dyn Write>,
    input: Option<String>,
    interactive: bool,
    title: String,
    client: ConversationClient,
}

impl ChatContext {
    pub fn new(
        output: Box<dyn Write>,
        input: Option<String>,
        interactive: bool,
        title: String,
        client: ConversationClient,
    ) -> Self {
        Self {
            output,
            input,
            interactive,
            title,
            client,
        }
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        // Single query
        if let Some(input) = self.input.take() {
            self.handle_input(&input).await?;
            return Ok(ExitCode::SUCCESS);
        }

        if self.interactive {
            self.print_welcome()?;
            self.run_interactive().await?;
        }

        Ok(ExitCode::SUCCESS)
    }

    fn print_welcome(&mut self) -> Result<()> {
        writeln!(self.output, "{}", cformat!("<bold>{}</>", self.title))?;
        render::write_message(
            &mut self.output,
            Role::Assistant,
            &self.title,
            GREETING,
        )?;
        writeln!(self.output, "{}", HELP_TEXT)?;
        Ok(())
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;
        let history_path = prompt::history_path();
        if let Some(path) = &history_path {
            if rl.load_history(path).is_err() {
                debug!("No input history at {}", path.display());
            }
        }

        loop {
            let prompt_text = generate_prompt(None);
            match rl.readline(&prompt_text) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    rl.add_history_entry(line.as_str());

                    if line.trim() == "/quit" {
                        break;
                    }

                    if let Err(e) = self.handle_input(&line).await {
                        writeln!(self.output, "Error: {}", e)?;
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    writeln!(self.output, "Error: {}", e)?;
                    break;
                }
            }
        }

        if let Some(path) = &history_path {
            if let Err(e) = prompt::persist_history(path, |p| rl.save_history(p)) {
                warn!("Failed to save input history: {:#}", e);
            }
        }

        Ok(())
    }

    async fn handle_input(&mut self, input: &str) -> Result<()> {
        match input.trim() {
            "" | "/quit" => {}
            "/help" => {
                writeln!(self.output, "{}", HELP_TEXT)?;
            }
            "/clear" => {
                self.client.clear_history().await;
                writeln!(self.output, "Conversation cleared.")?;
            }
            "/history" => {
                self.print_history().await?;
            }
            _ => {
                self.process_chat_input(input).await?;
            }
        }

        Ok(())
    }

    /// Forward the raw line to the client and show the reply.
    async fn process_chat_input(&mut self, input: &str) -> Result<()> {
        if self.interactive {
            self.output.queue(Print(THINKING_TEXT))?;
            self.output.flush()?;
        } else {
            // The line editor echoes typed input; a single query has no echo.
            render::write_message(&mut self.output, Role::User, &self.title, input)?;
        }

        let reply = self.client.send(input).await;

        if self.interactive {
            self.output
                .queue(MoveToColumn(0))?
                .queue(Clear(ClearType::CurrentLine))?;
        }

        render::write_message(
            &mut self.output,
            Role::Assistant,
            &self.title,
            &reply,
        )?;
        Ok(())
    }

    async fn print_history(&mut self) -> Result<()> {
        let history = self.client.history().await;
        if history.is_empty() {
            writeln!(self.output, "No messages yet.")?;
            return Ok(());
        }

        for message in &history {
            render::write_message(&mut self.output, message.role, &self.title, &message.content)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::chatbot_client::FALLBACK_REPLY;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn chat_context(url: &str, input: Option<&str>) -> (ChatContext, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let client = ConversationClient::new(url).unwrap();
        let context = ChatContext::new(
            Box::new(buffer.clone()),
            input.map(str::to_string),
            false,
            DEFAULT_TITLE.to_string(),
            client,
        );
        (context, buffer)
    }

    #[tokio::test]
    async fn single_query_prints_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .with_status(200)
            .with_body(r#"{"message":"Here is **bold** text"}"#)
            .create_async()
            .await;

        let (mut context, buffer) = chat_context(&server.url(), Some("Hello"));
        context.run().await.unwrap();

        mock.assert_async().await;
        let out = buffer.contents();
        let question = out.find("Hello").expect("question is echoed");
        let answer = out.find("Here is ").expect("reply is printed");
        assert!(out.contains("You:"));
        assert!(question < answer);
        assert!(out.contains(DEFAULT_TITLE));
        assert!(out.contains("bold"));
        assert!(!out.contains("**"));
    }

    #[tokio::test]
    async fn quit_as_single_query_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .expect(0)
            .create_async()
            .await;

        let (mut context, buffer) = chat_context(&server.url(), Some("/quit"));
        context.run().await.unwrap();

        mock.assert_async().await;
        assert!(buffer.contents().is_empty());
        assert!(context.client.history().await.is_empty());
    }

    #[tokio::test]
    async fn raw_line_is_forwarded_untrimmed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"messages":[{"role":"user","content":"  spaced  "}]}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"message":"ok"}"#)
            .create_async()
            .await;

        let (mut context, _buffer) = chat_context(&server.url(), None);
        context.handle_input("  spaced  ").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn blank_input_is_not_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .expect(0)
            .create_async()
            .await;

        let (mut context, buffer) = chat_context(&server.url(), None);
        context.handle_input("   ").await.unwrap();

        mock.assert_async().await;
        assert!(buffer.contents().is_empty());
    }

    #[tokio::test]
    async fn failure_shows_fallback_and_history_lists_turns() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat")
            .with_status(502)
            .create_async()
            .await;

        let (mut context, buffer) = chat_context(&server.url(), None);
        context.handle_input("Hello").await.unwrap();
        assert!(buffer.contents().contains(FALLBACK_REPLY));

        context.handle_input("/history").await.unwrap();
        let out = buffer.contents();
        assert!(out.contains("You:"));
        assert!(out.contains("Hello"));
    }

    #[tokio::test]
    async fn clear_command_empties_history() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat")
            .with_status(200)
            .with_body(r#"{"message":"Hi there"}"#)
            .create_async()
            .await;

        let (mut context, buffer) = chat_context(&server.url(), None);
        context.handle_input("Hello").await.unwrap();
        assert_eq!(context.client.history().await.len(), 2);

        context.handle_input("/clear").await.unwrap();

        assert!(context.client.history().await.is_empty());
        assert!(buffer.contents().contains("Conversation cleared."));
    }
}
