use anyhow::{Context, Result};
use std::path::Path;

/// Protocol instructions sent as the first (system) message of every session.
pub const SYSTEM_PROMPT: &str = r#"Corres en un ciclo de Pensamiento, Acción, PAUSA, Observación.
Al final del ciclo, das una Respuesta.
Después de recibir una observación, siempre debes responder con una línea que comience con "Respuesta:".
Si no tienes información, responde con "Respuesta: No tengo la información del curriculum disponible."
Si tienes información, resume los puntos clave comenzando la línea con "Respuesta:".
Si no se nombra a ninguna persona, debes usar el curriculum de Emma Johnson.

Tus acciones disponibles son:

buscar_cv:
Ejemplo: buscar_cv: Juan Perez
Devuelve la información relevante del curriculum de esa persona.

buscar_multi_cv:
Ejemplo: buscar_multi_cv: Juan Perez, Maria Garcia
Devuelve la información relevante de los curriculums de todas las personas nombradas.

Ejemplo de sesión:

Pregunta: ¿Qué experiencia tiene Juan Perez?
Pensamiento: Debería buscar el curriculum de Juan Perez.
Acción: buscar_cv: Juan Perez
PAUSA

(Esperar observación)

Observación: Juan Perez trabajó como ingeniero en Google y Tesla.

Respuesta: Juan Perez tiene experiencia como ingeniero en Google y Tesla."#;

/// The built-in prompt, or the contents of `path` when one is given.
pub async fn load_system_prompt(path: Option<&Path>) -> Result<String> {
    let Some(path) = path else {
        return Ok(SYSTEM_PROMPT.to_string());
    };

    let prompt = tokio::fs::read_to_string(path)
        .await
        .context(format!("Failed to read system prompt: {:?}", path))?;

    let prompt = prompt.trim();
    if prompt.is_empty() {
        anyhow::bail!("System prompt file is empty: {:?}", path);
    }
    Ok(prompt.to_string())
}
