use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info};

use warden_core::proto::Reply;
use warden_ipc::framing;

use crate::context::SharedCtx;
use crate::dispatch;

pub async fn serve(listener: UnixListener, ctx: SharedCtx) -> std::io::Result<()> {
    loop {
        let (stream, _addr) = listener.accept().await?;
        let ctx = SharedCtx::clone(&ctx);
        tokio::spawn(async move {
            if let Err(err) = handle_conn(stream, ctx).await {
                debug!("connection ended with error: {err}");
            }
        });
    }
}

async fn handle_conn(stream: UnixStream, ctx: SharedCtx) -> std::io::Result<()> {
    let mut framed = framing::framed(stream);

    while let Some(request) = framing::read_request(&mut framed).await? {
        let reply = dispatch::handle(request, &ctx).await;
        let shutting_down = matches!(reply.payload, Reply::ShutdownAck {});
        framing::send_reply(&mut framed, &reply).await?;

        if shutting_down {
            info!("shutdown requested by admin");
            ctx.scheduler.shutdown().await;
            std::process::exit(0);
        }
    }

    Ok(())
}
