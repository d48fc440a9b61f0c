//! The interactive session: one operator, one engine, one line at a time.
//!
//! The loop reads a line, dispatches it, and awaits settlement before
//! reading the next line, so at most one operation is in flight and output
//! from consecutive commands never interleaves. An interrupt signal is
//! treated exactly like `\q`.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use tracing::{debug, info};

use hearth_core::conversation::ConversationOutput;
use hearth_core::engine::{Assistant, Engine};
use hearth_core::error::Result;
use hearth_core::identity::resolve_local_identity;
use hearth_core::oauth::OAuthPairing;
use hearth_core::types::LocalIdentity;

use crate::commands::{DispatchOutcome, LineInput, dispatch_meta, parse_line};
use crate::verbs::VerbRegistry;

/// A persistent interrupt flag, armed once before the read loop starts.
///
/// A Ctrl-C arriving while a command is in flight has no `select!` branch
/// listening for it; the flag remembers the press until the command
/// settles, and `notify_one` stores a permit so a trip with no waiter
/// completes the next `wait`.
struct Interrupt {
    tripped: AtomicBool,
    notify: Notify,
}

impl Interrupt {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            tripped: AtomicBool::new(false),
            notify: Notify::new(),
        })
    }

    /// Arm the listener: the first Ctrl-C trips the flag.
    fn listen(self: &Arc<Self>) {
        let interrupt = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.trip();
            }
        });
    }

    fn trip(&self) {
        self.tripped.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

pub struct Session {
    identity: LocalIdentity,
    engine: Arc<dyn Engine>,
    output: Arc<dyn ConversationOutput>,
    pairing: OAuthPairing,
    verbs: VerbRegistry,
    prompt: String,
}

impl Session {
    /// Resolve the local operator identity and construct the session.
    ///
    /// Identity resolution failure is fatal; a session never starts with a
    /// partial identity.
    pub fn new(
        engine: Arc<dyn Engine>,
        output: Arc<dyn ConversationOutput>,
        prompt: String,
    ) -> Result<Self> {
        let identity = resolve_local_identity()?;
        Ok(Self::with_identity(identity, engine, output, prompt))
    }

    pub fn with_identity(
        identity: LocalIdentity,
        engine: Arc<dyn Engine>,
        output: Arc<dyn ConversationOutput>,
        prompt: String,
    ) -> Self {
        Self {
            identity,
            engine,
            output,
            pairing: OAuthPairing::new(),
            verbs: VerbRegistry::with_defaults(),
            prompt,
        }
    }

    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    /// Start the assistant-core conversation for this operator.
    pub fn start(&self) -> Result<()> {
        info!(account = %self.identity.account, uid = self.identity.uid, "session starting");
        self.engine
            .assistant()
            .start(&self.identity, self.output.clone())
    }

    /// Classify and execute one terminal line, running it to completion.
    pub async fn handle_line(&mut self, line: &str) -> Result<DispatchOutcome> {
        match parse_line(line)? {
            LineInput::Empty => Ok(DispatchOutcome::Continue),
            LineInput::Text(text) => {
                debug!(len = text.len(), "forwarding natural-language line");
                self.engine.assistant().handle_command(&text).await?;
                Ok(DispatchOutcome::Continue)
            }
            LineInput::Meta(command) => {
                dispatch_meta(command, self.engine.as_ref(), &mut self.pairing, &self.verbs).await
            }
        }
    }

    /// Run the read-dispatch-await cycle until quit, interrupt, or EOF.
    pub async fn run(&mut self) -> Result<()> {
        self.start()?;
        println!(
            "Welcome, {}! Type a command or \\? for help.",
            self.identity.display_name
        );

        let interrupt = Interrupt::new();
        interrupt.listen();
        self.run_loop(BufReader::new(tokio::io::stdin()), interrupt)
            .await
    }

    /// The read loop proper. An interrupt tripped while a command is in
    /// flight is observed right after that command settles, so it behaves
    /// exactly like a `\q` issued on the next line.
    async fn run_loop<R>(&mut self, reader: R, interrupt: Arc<Interrupt>) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        loop {
            print!("{}", self.prompt);
            let _ = std::io::stdout().flush();

            tokio::select! {
                biased;
                _ = interrupt.wait() => {
                    println!();
                    break;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        // EOF on stdin behaves like quit.
                        break;
                    };
                    match self.handle_line(&line).await {
                        Ok(DispatchOutcome::Quit) => break,
                        Ok(DispatchOutcome::Continue) => {}
                        // Command failures are reported and the session
                        // keeps accepting input.
                        Err(e) => println!("{e}"),
                    }
                    if interrupt.is_tripped() {
                        println!();
                        break;
                    }
                }
            }
        }

        self.shutdown().await
    }

    /// Print the farewell and run the engine shutdown sequence once.
    pub async fn shutdown(&self) -> Result<()> {
        println!("Bye!");
        info!("session closing");
        self.engine.close().await
    }
}
