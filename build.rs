fn main() {
    let built_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    println!("cargo:rustc-env=BUILD_DATE={built_at}");
    println!("cargo:rerun-if-changed=build.rs");
}
