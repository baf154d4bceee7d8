//! Version command implementation.

/// Version information for the CLI.
const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run() {
    println!("permiflow {VERSION}");
    println!();
    println!("Kubernetes RBAC scanning, risk classification and drift detection.");
    println!();
    println!("Build info:");
    println!("  Arch:         {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
}
