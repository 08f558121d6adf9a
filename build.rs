fn main() -> Result<(), Box<dyn std::error::Error>> {
    // protoc is only needed when the gRPC surface is compiled in
    if std::env::var_os("CARGO_FEATURE_SERVER").is_some() {
        tonic_build::compile_protos("proto/deskplan.proto")?;
    }
    println!("cargo:rerun-if-changed=proto/deskplan.proto");
    Ok(())
}
