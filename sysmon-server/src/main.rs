use sysmon::run_cli;
use sysmon::util::shutdown::wait_for_signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tokio::spawn(wait_for_signal());

    run_cli().await
}
