use crate::cli::CommonArgs;
use crate::provider::ChangeProvider;
use console::style;

pub fn exec(common: CommonArgs) -> anyhow::Result<()> {
    let session = common.session()?;
    let projects = session.provider.list_projects()?;

    println!("{}", style("Projects").bold());
    for (idx, name) in projects.iter().enumerate() {
        let path = session
            .settings
            .projects
            .get(name)
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!("{:>3}) {} {}", idx + 1, style(name).cyan(), style(path).dim());
    }
    Ok(())
}
