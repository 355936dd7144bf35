use atlas_daemon::config::AtlasConfig;
use atlas_daemon::node::AtlasNode;
use atlas_types::AtlasResult;

pub async fn run_checks(config: AtlasConfig) -> AtlasResult<()> {
    let node = AtlasNode::open(config)?;
    let report = node.diagnose().await;
    print!("{}", report);

    if report.has_failures() {
        println!("\nSome checks failed. Fix issues before running.");
    }
    report.into_result()
}
