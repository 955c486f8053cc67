fn main() -> Result<(), Box<dyn std::error::Error>> {
	let mut emitter = vergen_gitcl::Emitter::default();

	emitter.add_instructions(&vergen_gitcl::CargoBuilder::all_cargo()?)?;

	// Source tarballs have no git metadata.
	if emitter.add_instructions(&vergen_gitcl::GitclBuilder::all_git()?).is_err() {
		println!("cargo:rustc-env=VERGEN_GIT_SHA=unknown");
	}

	emitter.emit()?;

	Ok(())
}
