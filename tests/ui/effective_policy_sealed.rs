// This test proves that an EffectivePolicy cannot be assembled by hand even
// though its data fields are public. It must fail to compile.

use tacauthz::policy::reduce::EffectivePolicy;

fn main() {
    let _policy = EffectivePolicy {
        user: "mallory".to_owned(),
        services: Vec::new(),
        commands: Vec::new(),
    };
}
