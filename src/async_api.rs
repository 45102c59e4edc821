use crate::context::Context;
use crate::{Error, ImageGenerator, Result};
use std::thread;
use tokio::sync::oneshot;

/// Cancels the wrapped context when dropped, unless disarmed first
struct CancelOnDrop(Option<Context>);

impl CancelOnDrop {
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(ctx) = self.0.take() {
            ctx.cancel();
        }
    }
}

impl ImageGenerator {
    /// Async counterpart of [`create_with_context`](Self::create_with_context).
    ///
    /// The blocking run happens on a dedicated worker thread that owns the
    /// generator for the duration of the call, so the caller's task yields
    /// while wkhtmltoimage runs. Dropping the returned future kills the
    /// process; the generator is then left with default state.
    pub async fn create_async(&mut self, ctx: &Context) -> Result<()> {
        let run_ctx = ctx.child();
        let guard = CancelOnDrop(Some(run_ctx.clone()));

        let placeholder = ImageGenerator::with_resolver(self.resolver.clone());
        let mut generator = std::mem::replace(self, placeholder);

        let (tx, rx) = oneshot::channel();
        thread::spawn(move || {
            let res = generator.run(&run_ctx);
            // The receiver is gone only when the caller stopped waiting.
            let _ = tx.send((generator, res));
        });

        let (generator, res) = rx
            .await
            .map_err(|e| Error::Other(format!("Render worker canceled: {}", e)))?;
        guard.disarm();
        *self = generator;
        res
    }
}
