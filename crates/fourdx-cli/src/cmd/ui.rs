use crate::env::Env;
use anyhow::Result;

pub fn run(env: &Env, port: u16, no_open: bool) -> Result<()> {
    // Fail before binding when the workspace is missing.
    env.open()?;

    let rt = tokio::runtime::Runtime::new()?;
    let root = env.root().to_path_buf();

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let actual_port = listener.local_addr()?.port();
        println!(
            "fourdx for {} -> http://localhost:{actual_port}  (PID {})",
            root.display(),
            std::process::id()
        );

        tokio::select! {
            res = fourdx_server::serve_on(root, listener, !no_open) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
