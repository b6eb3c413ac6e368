use std::path::PathBuf;

fn main() {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));
    let proto_dir = manifest_dir.join("proto");

    let protos = [proto_dir.join("wcf.proto"), proto_dir.join("roomdata.proto")];
    for path in protos.iter().chain(std::iter::once(&proto_dir)) {
        println!("cargo:rerun-if-changed={}", path.display());
    }

    let proto_paths: Vec<_> = protos
        .iter()
        .map(|path| path.to_string_lossy().to_string())
        .collect();

    let include_paths = [proto_dir.to_string_lossy().to_string()];

    let mut config = prost_build::Config::new();
    config.type_attribute(".", "#[derive(serde::Serialize, serde::Deserialize)]");
    config.compile_protos(&proto_paths, &include_paths).expect("compile protos");
}
