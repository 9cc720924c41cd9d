use crate::cli::{Cli, Shell};
use clap::CommandFactory;
use clap_complete::{generate, Shell as ClapShell};
use std::io::{self, Write};

const BIN_NAME: &str = "leasetimer";

impl From<Shell> for ClapShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => ClapShell::Bash,
            Shell::Zsh => ClapShell::Zsh,
            Shell::Fish => ClapShell::Fish,
            Shell::PowerShell => ClapShell::PowerShell,
            Shell::Elvish => ClapShell::Elvish,
        }
    }
}

fn install_hint(shell: &Shell) -> &'static str {
    match shell {
        Shell::Bash => "# Add to ~/.bashrc:\n#   eval \"$(leasetimer completions bash)\"",
        Shell::Zsh => {
            "# Save to a directory on $fpath:\n#   leasetimer completions zsh > ~/.zfunc/_leasetimer"
        }
        Shell::Fish => {
            "# Save to:\n#   leasetimer completions fish > ~/.config/fish/completions/leasetimer.fish"
        }
        Shell::PowerShell => {
            "# Add to your profile:\n#   leasetimer completions powershell | Out-String | Invoke-Expression"
        }
        Shell::Elvish => "# Add to rc.elv:\n#   eval (leasetimer completions elvish | slurp)",
    }
}

pub fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    generate(ClapShell::from(shell), &mut cmd, BIN_NAME, out);
}

pub fn execute(shell: Shell) {
    eprintln!("Generating completion file for {:?}...", shell);
    let hint = install_hint(&shell);
    write_completions(shell, &mut io::stdout());
    eprintln!("\n{}", hint);
}
