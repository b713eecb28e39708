fn main() {
    storybook_pipeline::cli::run();
}
