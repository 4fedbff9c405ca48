use axum::response::Html;

/// Camera page: start the webcam, freeze a 640x480 frame, send it with a
/// prompt to the transform endpoint and show the generated image.
pub async fn index() -> Html<&'static str> {
    Html(CAMERA_PAGE)
}

pub const CAMERA_PAGE: &str = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Sketch to Image</title>
    <style>
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
            background: #f4f5fb;
            min-height: 100vh;
            padding: 20px;
        }

        .container {
            background: white;
            border-radius: 16px;
            box-shadow: 0 10px 30px rgba(0,0,0,0.1);
            max-width: 720px;
            margin: 0 auto;
            padding: 32px;
        }

        h1 {
            color: #333;
            margin-bottom: 16px;
            font-size: 1.6em;
        }

        h2 {
            color: #333;
            margin-bottom: 8px;
            font-size: 1.2em;
        }

        video, .frame {
            width: 100%;
            max-width: 448px;
            border-radius: 10px;
            display: block;
        }

        video {
            background: #111;
            margin: 12px 0;
        }

        canvas {
            display: none;
        }

        button {
            background: #667eea;
            color: white;
            border: none;
            border-radius: 8px;
            padding: 10px 18px;
            font-size: 0.95em;
            font-weight: 600;
            cursor: pointer;
        }

        button:disabled {
            background: #aab2f0;
            cursor: not-allowed;
        }

        input[type="text"] {
            width: 100%;
            max-width: 448px;
            padding: 10px;
            border: 2px solid #e0e0e0;
            border-radius: 8px;
            font-size: 1em;
            margin: 8px 0;
            display: block;
        }

        .card {
            background: #f8f9ff;
            border-radius: 10px;
            padding: 16px;
            margin-top: 16px;
            display: none;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>Sketch to Image</h1>

        <button id="startCamera">Start Camera</button>
        <video id="video" autoplay playsinline></video>
        <canvas id="canvas" width="640" height="480"></canvas>
        <button id="captureImage">Capture Image</button>

        <div class="card" id="captureCard">
            <img id="capturedImage" class="frame" alt="Captured" width="640" height="480">
            <input type="text" id="prompt" placeholder="Enter prompt">
            <button id="sendImage">Send to API</button>
        </div>

        <div class="card" id="resultCard">
            <h2>Result</h2>
            <img id="resultImage" class="frame" alt="Result" width="640" height="480">
        </div>
    </div>

    <script>
        const video = document.getElementById('video');
        const canvas = document.getElementById('canvas');
        const captureCard = document.getElementById('captureCard');
        const capturedImageEl = document.getElementById('capturedImage');
        const promptInput = document.getElementById('prompt');
        const sendButton = document.getElementById('sendImage');
        const resultCard = document.getElementById('resultCard');
        const resultImageEl = document.getElementById('resultImage');

        let capturedImage = null;
        let isLoading = false;

        function setResult(url) {
            if (url) {
                resultImageEl.src = url;
                resultCard.style.display = 'block';
            } else {
                resultImageEl.removeAttribute('src');
                resultCard.style.display = 'none';
            }
        }

        function setLoading(loading) {
            isLoading = loading;
            sendButton.disabled = loading;
            sendButton.textContent = loading ? 'Processing...' : 'Send to API';
        }

        async function startCamera() {
            try {
                const stream = await navigator.mediaDevices.getUserMedia({ video: true });
                video.srcObject = stream;
            } catch (err) {
                console.error('Error accessing camera:', err);
            }
        }

        function captureImage() {
            const context = canvas.getContext('2d');
            if (!context) return;
            context.drawImage(video, 0, 0, 640, 480);
            capturedImage = canvas.toDataURL('image/jpeg');
            capturedImageEl.src = capturedImage;
            captureCard.style.display = 'block';
        }

        async function sendImage() {
            const prompt = promptInput.value;
            if (!capturedImage || !prompt || isLoading) return;

            setLoading(true);
            try {
                const response = await fetch('/api/sketchToImage', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({ image: capturedImage, prompt })
                });

                if (!response.ok) {
                    throw new Error('HTTP error! status: ' + response.status);
                }

                const data = await response.json();
                setResult(data.image_url);
            } catch (error) {
                console.error('Error sending image:', error);
                setResult(null);
            } finally {
                setLoading(false);
            }
        }

        document.getElementById('startCamera').addEventListener('click', startCamera);
        document.getElementById('captureImage').addEventListener('click', captureImage);
        sendButton.addEventListener('click', sendImage);
    </script>
</body>
</html>
"#;
